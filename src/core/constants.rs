//! Protocol constants for PeSIT.
//!
//! Wire sizes and negotiation defaults. The wire values are fixed by the
//! protocol and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// FPDU FRAMING
// =============================================================================

/// FPDU header size (length + phase + type + idDst + idSrc).
pub const FPDU_HEADER_SIZE: usize = 6;

/// Size of the big-endian length prefix at the start of every FPDU.
pub const FPDU_LENGTH_SIZE: usize = 2;

/// Largest FPDU expressible with a 16-bit length prefix.
pub const MAX_FPDU_SIZE: usize = u16::MAX as usize;

/// Size of the length prefix in front of each transport entity.
pub const ENTITY_LENGTH_SIZE: usize = 2;

// =============================================================================
// PARAMETER ENCODING
// =============================================================================

/// Length byte announcing that a 2-byte extended length follows.
pub const EXTENDED_LENGTH_MARKER: u8 = 0xFF;

/// Largest value length that still fits the short (1-byte) length form.
pub const MAX_SHORT_PARAMETER_LENGTH: usize = 254;

/// Wire size of a diagnostic parameter value.
pub const DIAGNOSTIC_SIZE: usize = 3;

/// Wire size of the sync-points descriptor (interval KB + window).
pub const SYNC_POINTS_DESCRIPTOR_SIZE: usize = 3;

// =============================================================================
// CONNECTION
// =============================================================================

/// Protocol version announced in CONNECT.
pub const PROTOCOL_VERSION: u8 = 2;

/// Destination id used on CONNECT, before the peer assigned its own.
pub const UNASSIGNED_CONNECTION_ID: u8 = 0;

/// Size of the legacy pre-connection message (three 8-byte EBCDIC fields).
pub const PRE_CONNECTION_SIZE: usize = 24;

/// Width of each field in the pre-connection message.
pub const PRE_CONNECTION_FIELD_SIZE: usize = 8;

// =============================================================================
// SYNC POINTS
// =============================================================================

/// Interval value meaning sync points are disabled.
pub const SYNC_INTERVAL_DISABLED: u16 = 0;

/// Interval value meaning "undefined"; read as [`DEFAULT_SYNC_INTERVAL_KB`].
pub const SYNC_INTERVAL_UNDEFINED: u16 = 0xFFFF;

/// Interval assumed when the peer announces an undefined interval.
pub const DEFAULT_SYNC_INTERVAL_KB: u16 = 32;

/// Interval proposed by [`SyncPointsDescriptor::default`](crate::sync::SyncPointsDescriptor).
pub const DEFAULT_PROPOSED_SYNC_INTERVAL_KB: u16 = 64;

/// Window proposed by default.
pub const DEFAULT_SYNC_WINDOW: u8 = 1;

/// Largest acknowledgement window the protocol allows.
pub const MAX_SYNC_WINDOW: u8 = 16;

/// Bytes per sync interval unit.
pub const SYNC_INTERVAL_UNIT: u64 = 1024;

// =============================================================================
// SESSION DEFAULTS
// =============================================================================

/// Default time to wait for an acknowledgement.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum entity size offered on CREATE.
pub const DEFAULT_MAX_ENTITY_SIZE: u16 = u16::MAX;

/// Default record length offered on CREATE.
pub const DEFAULT_RECORD_LENGTH: u16 = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fits_length_prefix() {
        assert!(FPDU_HEADER_SIZE > FPDU_LENGTH_SIZE);
        assert_eq!(MAX_FPDU_SIZE, 65535);
    }

    #[test]
    fn test_sync_defaults() {
        assert!(DEFAULT_SYNC_WINDOW <= MAX_SYNC_WINDOW);
        assert_ne!(DEFAULT_SYNC_INTERVAL_KB, SYNC_INTERVAL_UNDEFINED);
    }
}
