//! Error types for the PeSIT protocol engine.
//!
//! Errors are layered the same way the engine is: parameter decoding feeds
//! FPDU parsing, and both feed the session-level [`PesitError`].

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::fpdu::{DiagnosticCode, FpduType};

/// Errors decoding a single parameter or parameter group.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// The length byte, or the 2-byte extended length, is missing.
    #[error("parameter {id}: truncated length field")]
    TruncatedLength {
        /// Parameter or group identifier.
        id: u8,
    },

    /// The declared length exceeds the remaining bytes.
    #[error("parameter {id}: declared length {declared} exceeds {available} available bytes")]
    TruncatedValue {
        /// Parameter or group identifier.
        id: u8,
        /// Declared value length.
        declared: usize,
        /// Bytes actually available after the header.
        available: usize,
    },

    /// The identifier is neither a known parameter nor a known group.
    #[error("unknown PeSIT parameter id {id} (0x{id:02X}) with length {length} bytes in {context}")]
    UnknownParameter {
        /// Unresolved identifier.
        id: u8,
        /// Declared value length.
        length: usize,
        /// Where it was found, e.g. `FPDU ACONNECT` or `PGI FILE_ID`.
        context: String,
    },
}

impl ParameterError {
    /// Check if the input is structurally malformed, as opposed to using
    /// an identifier this implementation does not know.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ParameterError::UnknownParameter { .. })
    }
}

/// Errors parsing an FPDU from bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer bytes than an FPDU header, or a length prefix below 6.
    #[error("FPDU too short: {actual} bytes")]
    FrameTooShort {
        /// Available (or declared) length.
        actual: usize,
    },

    /// The length prefix announces more bytes than available.
    #[error("FPDU length mismatch: declared {declared}, available {available}")]
    LengthMismatch {
        /// Declared FPDU length.
        declared: usize,
        /// Bytes available in the buffer.
        available: usize,
    },

    /// The phase/type pair does not name a known FPDU.
    #[error("unknown FPDU type: phase 0x{phase:02X}, type 0x{code:02X}")]
    UnknownFpduType {
        /// Phase byte.
        phase: u8,
        /// Type byte.
        code: u8,
    },

    /// A parameter inside the FPDU could not be decoded.
    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// Errors building an FPDU.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A parameter required for this FPDU type was not supplied.
    #[error("{kind}: missing mandatory parameter {id}")]
    MissingMandatoryParameter {
        /// FPDU type being built.
        kind: FpduType,
        /// Missing parameter identifier.
        id: u8,
    },

    /// Parameters were given for a DTF-family FPDU, or raw data for any other.
    #[error("{kind}: payload does not match the FPDU family")]
    PayloadMismatch {
        /// FPDU type being built.
        kind: FpduType,
    },

    /// The encoded FPDU would not fit its 16-bit length prefix.
    #[error("encoded FPDU too large: {length} bytes")]
    TooLarge {
        /// Encoded length.
        length: usize,
    },

    /// A parameter value is not acceptable for its identifier.
    #[error("parameter {id}: {reason}")]
    InvalidValue {
        /// Parameter identifier.
        id: u8,
        /// What is wrong with it.
        reason: String,
    },
}

/// Top-level PeSIT errors.
#[derive(Debug, Error)]
pub enum PesitError {
    /// Incoming bytes could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// An outgoing FPDU could not be built.
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// The peer sent ABORT.
    #[error("peer aborted: {diagnostic}")]
    ProtocolAbort {
        /// Diagnostic carried by the ABORT.
        diagnostic: DiagnosticCode,
        /// Last sync point emitted or received on this session.
        last_sync: u32,
        /// Restart point confirmed by the peer, if one was received.
        restart_point: Option<u32>,
    },

    /// The peer answered with RCONNECT or a negative acknowledgement.
    #[error("{kind} rejected: {diagnostic}")]
    Rejected {
        /// Response FPDU type.
        kind: FpduType,
        /// Diagnostic carried by the response.
        diagnostic: DiagnosticCode,
    },

    /// Nothing arrived within the receive timeout.
    #[error("timed out after {after:?} waiting for {awaiting}")]
    Timeout {
        /// What was being waited for, e.g. `ACK_WRITE`.
        awaiting: &'static str,
        /// Configured receive timeout.
        after: Duration,
    },

    /// An FPDU arrived that cannot be handled at this point.
    #[error("unexpected {actual}, expected {expected}")]
    UnexpectedFpdu {
        /// What was expected.
        expected: FpduType,
        /// What arrived.
        actual: FpduType,
    },

    /// `send_and_await_ack` was called with an FPDU that is never acknowledged.
    #[error("{kind} has no acknowledgement")]
    NoAcknowledgement {
        /// FPDU type sent.
        kind: FpduType,
    },

    /// A sync point number did not follow the previous one.
    #[error("sync point out of order: expected {expected}, got {actual}")]
    SyncOutOfOrder {
        /// Next expected sync number.
        expected: u32,
        /// Received sync number.
        actual: u32,
    },

    /// The legacy pre-connection handshake was not answered with ACK0.
    #[error("pre-connection refused")]
    PreConnectionRefused,

    /// Transport failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl PesitError {
    /// Check if the caller may clean up and retry the transfer.
    ///
    /// Parse and build errors are protocol mismatches and terminate the
    /// exchange; aborts, rejections, and timeouts are expected conditions.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PesitError::ProtocolAbort { .. }
                | PesitError::Rejected { .. }
                | PesitError::Timeout { .. }
        )
    }

    /// Diagnostic code carried by the peer, if any.
    pub fn diagnostic(&self) -> Option<DiagnosticCode> {
        match self {
            PesitError::ProtocolAbort { diagnostic, .. }
            | PesitError::Rejected { diagnostic, .. } => Some(*diagnostic),
            _ => None,
        }
    }

    /// Check if the peer refused to restart the transfer.
    pub fn is_restart_rejection(&self) -> bool {
        self.diagnostic()
            .is_some_and(|diagnostic| diagnostic.is_restart_rejection())
    }
}

/// Result type for session operations.
pub type PesitResult<T> = Result<T, PesitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_parameter_message() {
        let err = ParameterError::UnknownParameter {
            id: 250,
            length: 1,
            context: "FPDU ACONNECT".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unknown PeSIT parameter id 250 (0xFA) with length 1 bytes in FPDU ACONNECT"
        );
        assert!(!err.is_malformed());
        assert!(ParameterError::TruncatedLength { id: 3 }.is_malformed());
    }

    #[test]
    fn test_recoverable_errors() {
        let abort = PesitError::ProtocolAbort {
            diagnostic: DiagnosticCode::new(3, 301),
            last_sync: 2,
            restart_point: None,
        };
        assert!(abort.is_recoverable());
        assert_eq!(abort.diagnostic(), Some(DiagnosticCode::new(3, 301)));

        let timeout = PesitError::Timeout {
            awaiting: "ACK_WRITE",
            after: Duration::from_secs(1),
        };
        assert!(timeout.is_recoverable());
        assert_eq!(timeout.diagnostic(), None);

        let parse = PesitError::from(ParseError::FrameTooShort { actual: 3 });
        assert!(!parse.is_recoverable());
        let io = PesitError::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert!(!io.is_recoverable());
    }

    #[test]
    fn test_restart_rejection() {
        let rejected = PesitError::Rejected {
            kind: FpduType::AckSelect,
            diagnostic: DiagnosticCode::RESTART_NO_MATCHING_TRANSFER,
        };
        assert!(rejected.is_restart_rejection());

        let not_found = PesitError::Rejected {
            kind: FpduType::AckSelect,
            diagnostic: DiagnosticCode::FILE_NOT_FOUND,
        };
        assert!(!not_found.is_restart_rejection());
    }
}
