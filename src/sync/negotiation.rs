//! Sync-point negotiation
//!
//! The initiator proposes an interval and window in CONNECT (PI 7); the
//! responder's ACONNECT carries the values actually in force.

use tracing::debug;

use crate::core::{
    DEFAULT_PROPOSED_SYNC_INTERVAL_KB, DEFAULT_SYNC_INTERVAL_KB, DEFAULT_SYNC_WINDOW, MAX_SYNC_WINDOW,
    ParameterError, SYNC_INTERVAL_DISABLED, SYNC_INTERVAL_UNDEFINED, SYNC_INTERVAL_UNIT,
    SYNC_POINTS_DESCRIPTOR_SIZE,
};
use crate::fpdu::{Fpdu, Parameter, ParameterId};

/// PI 7 value: interval in KB and acknowledgement window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPointsDescriptor {
    /// Interval in KB (0 disables, 0xFFFF means undefined)
    pub interval_kb: u16,
    /// Outstanding sync points allowed before the sender blocks (0 to 16)
    pub window: u8,
}

impl Default for SyncPointsDescriptor {
    fn default() -> Self {
        Self::new(DEFAULT_PROPOSED_SYNC_INTERVAL_KB, DEFAULT_SYNC_WINDOW)
    }
}

impl SyncPointsDescriptor {
    /// Create a descriptor, clamping the window to 16
    pub fn new(interval_kb: u16, window: u8) -> Self {
        Self {
            interval_kb,
            window: window.min(MAX_SYNC_WINDOW),
        }
    }

    /// Wire form: interval (2 bytes BE) then window
    pub fn to_bytes(self) -> [u8; SYNC_POINTS_DESCRIPTOR_SIZE] {
        let [hi, lo] = self.interval_kb.to_be_bytes();
        [hi, lo, self.window.min(MAX_SYNC_WINDOW)]
    }

    /// Parse the 3-byte wire form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParameterError> {
        match bytes {
            [hi, lo, window] => Ok(Self::new(u16::from_be_bytes([*hi, *lo]), *window)),
            _ => Err(ParameterError::TruncatedValue {
                id: ParameterId::SyncPoints as u8,
                declared: SYNC_POINTS_DESCRIPTOR_SIZE,
                available: bytes.len(),
            }),
        }
    }

    /// As a PI 7 parameter
    pub fn to_parameter(self) -> Parameter {
        Parameter::bytes(ParameterId::SyncPoints, self.to_bytes().to_vec())
    }

    /// Read PI 7 from an FPDU, if present
    pub fn from_fpdu(fpdu: &Fpdu) -> Result<Option<Self>, ParameterError> {
        fpdu.parameter(ParameterId::SyncPoints)
            .map(|p| Self::from_bytes(&p.value))
            .transpose()
    }

    /// Check if this descriptor disables sync points
    pub fn is_disabled(self) -> bool {
        self.interval_kb == SYNC_INTERVAL_DISABLED
    }

    /// Interval in KB with "undefined" resolved to the 32 KB convention
    pub fn effective_interval_kb(self) -> u16 {
        match self.interval_kb {
            SYNC_INTERVAL_UNDEFINED => DEFAULT_SYNC_INTERVAL_KB,
            kb => kb,
        }
    }

    /// Interval in bytes (0 when disabled)
    pub fn interval_bytes(self) -> u64 {
        u64::from(self.effective_interval_kb()) * SYNC_INTERVAL_UNIT
    }
}

/// Sync parameters in force for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NegotiatedSync {
    /// Interval in bytes; 0 means sync points are disabled
    pub interval_bytes: u64,
    /// Acknowledgement window; 0 means sync points are never acknowledged
    pub window: u8,
}

impl NegotiatedSync {
    /// Sync points disabled
    pub const DISABLED: Self = Self { interval_bytes: 0, window: 0 };

    /// Settle the values in force from the proposal and the response.
    ///
    /// The responder's descriptor always wins. Without a proposal, or
    /// without a descriptor in the response, sync points are off.
    pub fn negotiate(
        proposed: Option<SyncPointsDescriptor>,
        response: Option<SyncPointsDescriptor>,
    ) -> Self {
        let negotiated = match (proposed, response) {
            (Some(_), Some(response)) if !response.is_disabled() => Self {
                interval_bytes: response.interval_bytes(),
                window: response.window,
            },
            _ => Self::DISABLED,
        };
        debug!(
            proposed = ?proposed,
            response = ?response,
            interval_bytes = negotiated.interval_bytes,
            window = negotiated.window,
            "negotiated sync points"
        );
        negotiated
    }

    /// Check if sync points are in use
    pub fn is_enabled(self) -> bool {
        self.interval_bytes > 0
    }
}
