//! Legacy pre-connection handshake.
//!
//! Some mainframe peers send a fixed 24-byte EBCDIC message before the
//! first FPDU:
//!
//! ```text
//! +----------------+----------------+----------------+
//! | "PESIT   " (8) | identifier (8) |  password (8)  |
//! +----------------+----------------+----------------+
//! ```
//!
//! Fields are space padded. The responder answers `ACK0` in EBCDIC. Both
//! messages are entity framed like FPDUs.

use std::fmt;

use super::ebcdic;
use crate::core::{PRE_CONNECTION_FIELD_SIZE, PRE_CONNECTION_SIZE};

/// Protocol tag opening the pre-connection message.
pub const PRE_CONNECTION_TAG: &str = "PESIT";

/// `ACK0` in EBCDIC.
pub const ACK0: [u8; 4] = [0xC1, 0xC3, 0xD2, 0xF0];

/// A decoded pre-connection message.
#[derive(Clone, PartialEq, Eq)]
pub struct PreConnection {
    /// Requester identifier (at most 8 characters on the wire).
    pub identifier: String,
    /// Password (at most 8 characters on the wire).
    pub password: String,
}

impl fmt::Debug for PreConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreConnection")
            .field("identifier", &self.identifier)
            .field("password", &"********")
            .finish()
    }
}

impl PreConnection {
    /// Create a pre-connection message.
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }

    /// Encode to the 24-byte EBCDIC form. Longer fields are truncated.
    pub fn encode(&self) -> [u8; PRE_CONNECTION_SIZE] {
        let text: String = [PRE_CONNECTION_TAG, self.identifier.as_str(), self.password.as_str()]
            .iter()
            .map(|field| pad(field))
            .collect();

        let mut out = [0u8; PRE_CONNECTION_SIZE];
        out.copy_from_slice(&ebcdic::encode(&text)[..PRE_CONNECTION_SIZE]);
        out
    }

    /// Decode a pre-connection message, if `bytes` is one.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if !is_pre_connection(bytes) {
            return None;
        }
        let text = ebcdic::decode(bytes);
        let field = |index: usize| {
            let raw: String = text
                .chars()
                .skip(index * PRE_CONNECTION_FIELD_SIZE)
                .take(PRE_CONNECTION_FIELD_SIZE)
                .collect();
            raw.trim_end().to_string()
        };
        Some(Self::new(field(1), field(2)))
    }
}

/// Check if an entity is the 24-byte EBCDIC pre-connection message.
pub fn is_pre_connection(bytes: &[u8]) -> bool {
    bytes.len() == PRE_CONNECTION_SIZE
        && ebcdic::is_ebcdic(bytes)
        && ebcdic::decode(&bytes[..PRE_CONNECTION_TAG.len()]) == PRE_CONNECTION_TAG
}

/// Check if a response is the `ACK0` acknowledgement.
pub fn is_ack0(bytes: &[u8]) -> bool {
    bytes == ACK0
}

fn pad(field: &str) -> String {
    let truncated: String = field.chars().take(PRE_CONNECTION_FIELD_SIZE).collect();
    format!("{truncated:<width$}", width = PRE_CONNECTION_FIELD_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let bytes = PreConnection::new("LOOP", "SECRET").encode();
        assert_eq!(ebcdic::decode(&bytes), "PESIT   LOOP    SECRET  ");
        assert_eq!(&bytes[..6], &[0xD7, 0xC5, 0xE2, 0xC9, 0xE3, 0x40]);
    }

    #[test]
    fn test_parse_roundtrip() {
        let message = PreConnection::new("BANK01", "PW");
        assert_eq!(PreConnection::parse(&message.encode()), Some(message));
    }

    #[test]
    fn test_long_fields_truncated() {
        let bytes = PreConnection::new("IDENTIFIER", "PASSWORD123").encode();
        let parsed = PreConnection::parse(&bytes).unwrap();
        assert_eq!(parsed.identifier, "IDENTIFI");
        assert_eq!(parsed.password, "PASSWORD");
    }

    #[test]
    fn test_rejects_non_handshake() {
        // Right size, but ASCII.
        assert!(PreConnection::parse(b"PESIT   LOOP    SECRET  ").is_none());
        // EBCDIC, wrong tag.
        let mut bytes = PreConnection::new("A", "B").encode();
        bytes[0] = 0xC1;
        assert!(!is_pre_connection(&bytes));
        // EBCDIC, wrong size.
        assert!(!is_pre_connection(&bytes[..20]));
    }

    #[test]
    fn test_ack0() {
        assert_eq!(ACK0.to_vec(), ebcdic::encode("ACK0"));
        assert!(is_ack0(&ACK0));
        assert!(!is_ack0(b"ACK0"));
    }

    #[test]
    fn test_debug_masks_password() {
        let debug = format!("{:?}", PreConnection::new("LOOP", "SECRET"));
        assert!(!debug.contains("SECRET"));
    }
}
