//! Restart bookkeeping
//!
//! A restart re-issues CREATE or SELECT with the restart flag and the
//! transfer id of the interrupted attempt. The responder answers WRITE or
//! READ with the last sync number it recorded durably (PI 18); numbering
//! and the byte position resume from there.

use crate::fpdu::{Fpdu, ParameterId};

/// Byte offset implied by a sync number.
///
/// This is `sync × interval`: an approximation, since exact byte counts
/// per sync point are not recorded. With sync points disabled it is 0.
pub fn resume_offset(sync: u32, interval_bytes: u64) -> u64 {
    u64::from(sync) * interval_bytes
}

/// Restart point carried by an acknowledgement (PI 18), if any
pub fn restart_point(fpdu: &Fpdu) -> Option<u32> {
    fpdu.numeric(ParameterId::RestartPoint)
        .and_then(|value| u32::try_from(value).ok())
}

/// Resume position agreed with the responder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPoint {
    /// Transfer being resumed
    pub transfer_id: u32,
    /// Last sync number the responder recorded
    pub sync: u32,
    /// Approximate byte offset to resume from
    pub offset: u64,
}

impl RestartPoint {
    /// Resume position for `sync` at the given interval
    pub fn new(transfer_id: u32, sync: u32, interval_bytes: u64) -> Self {
        Self {
            transfer_id,
            sync,
            offset: resume_offset(sync, interval_bytes),
        }
    }

    /// Number of the next sync point to emit
    pub fn next_sync(&self) -> u32 {
        self.sync + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fpdu::{DiagnosticCode, FpduType, Parameter};

    #[test]
    fn test_resume_offset() {
        assert_eq!(resume_offset(2, 32 * 1024), 65_536);
        assert_eq!(resume_offset(0, 32 * 1024), 0);
        assert_eq!(resume_offset(5, 0), 0);
    }

    #[test]
    fn test_restart_point_from_ack() {
        let ack = Fpdu::with_diagnostic(FpduType::AckWrite, 5, 9, DiagnosticCode::SUCCESS)
            .push(Parameter::numeric(ParameterId::RestartPoint, 2));
        assert_eq!(restart_point(&ack), Some(2));
        assert_eq!(restart_point(&Fpdu::new(FpduType::AckWrite, 5, 9)), None);
    }

    #[test]
    fn test_next_sync() {
        let point = RestartPoint::new(7, 2, 32 * 1024);
        assert_eq!(point.next_sync(), 3);
        assert_eq!(point.offset, 65_536);
    }
}
