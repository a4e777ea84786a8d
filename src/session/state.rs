//! Session phases and per-connection state.

use crate::fpdu::FpduType;
use crate::sync::NegotiatedSync;

/// Session lifecycle phase.
///
/// Tracked for observability; operations are not refused based on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Nothing sent yet.
    #[default]
    Idle,
    /// CONNECT sent, waiting for ACONNECT or RCONNECT.
    ConnectPending,
    /// Connection accepted.
    Connected,
    /// A file is created or selected.
    FileSelected,
    /// The file is open.
    Open,
    /// WRITE or READ acknowledged; data is flowing.
    Transferring,
    /// RELEASE sent, waiting for RELCONF.
    Closing,
    /// Connection released.
    Released,
    /// ABORT sent or received.
    Aborted,
}

impl SessionPhase {
    /// Phase entered when `request` is sent.
    pub fn on_send(self, request: FpduType) -> Self {
        match request {
            FpduType::Connect => Self::ConnectPending,
            FpduType::Release => Self::Closing,
            FpduType::Abort => Self::Aborted,
            _ => self,
        }
    }

    /// Phase entered when a positive `response` arrives.
    pub fn on_response(self, response: FpduType) -> Self {
        match response {
            FpduType::Aconnect => Self::Connected,
            FpduType::Rconnect | FpduType::Relconf => Self::Released,
            FpduType::AckCreate | FpduType::AckSelect | FpduType::AckClose => Self::FileSelected,
            FpduType::AckOpen | FpduType::AckTransEnd | FpduType::AckIdt => Self::Open,
            FpduType::AckWrite | FpduType::AckRead => Self::Transferring,
            FpduType::AckDeselect => Self::Connected,
            FpduType::Abort => Self::Aborted,
            _ => self,
        }
    }

    /// Check if the connection is over.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Aborted)
    }
}

/// Mutable per-connection state, owned by one session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Our connection id (idSrc on everything we send).
    pub local_id: u8,
    /// Peer-assigned connection id, learned from ACONNECT (idDst afterwards).
    pub peer_id: u8,
    /// Current phase.
    pub phase: SessionPhase,
    /// Sync parameters in force.
    pub sync: NegotiatedSync,
    /// Transfer id of the current CREATE or SELECT.
    pub transfer_id: Option<u32>,
    /// Restart point returned by the last WRITE or READ acknowledgement.
    pub restart_point: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_sequence() {
        let mut phase = SessionPhase::default().on_send(FpduType::Connect);
        assert_eq!(phase, SessionPhase::ConnectPending);

        for (response, expected) in [
            (FpduType::Aconnect, SessionPhase::Connected),
            (FpduType::AckCreate, SessionPhase::FileSelected),
            (FpduType::AckOpen, SessionPhase::Open),
            (FpduType::AckWrite, SessionPhase::Transferring),
            (FpduType::AckTransEnd, SessionPhase::Open),
            (FpduType::AckClose, SessionPhase::FileSelected),
            (FpduType::AckDeselect, SessionPhase::Connected),
        ] {
            phase = phase.on_response(response);
            assert_eq!(phase, expected, "after {response}");
        }

        phase = phase.on_send(FpduType::Release);
        assert_eq!(phase, SessionPhase::Closing);
        assert_eq!(phase.on_response(FpduType::Relconf), SessionPhase::Released);
    }

    #[test]
    fn test_abort_from_anywhere() {
        for phase in [SessionPhase::Idle, SessionPhase::Open, SessionPhase::Transferring] {
            assert_eq!(phase.on_response(FpduType::Abort), SessionPhase::Aborted);
            assert!(phase.on_response(FpduType::Abort).is_terminal());
        }
    }

    #[test]
    fn test_sync_ack_keeps_phase() {
        assert_eq!(
            SessionPhase::Transferring.on_response(FpduType::AckSyn),
            SessionPhase::Transferring
        );
    }
}
