//! Diagnostic registry.
//!
//! A diagnostic is 3 bytes on the wire: a category byte followed by a
//! 2-byte big-endian reason. `(0, 0)` means success. Messages come from a
//! static table; codes missing from it still round-trip and display as
//! unrecognized.

use std::fmt;

use crate::core::DIAGNOSTIC_SIZE;

/// A 3-byte PeSIT diagnostic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    /// Category: 0 success, 1 transfer, 2 file, 3 connection.
    pub category: u8,
    /// Reason within the category.
    pub reason: u16,
}

/// Message used for codes absent from the registry.
pub const UNRECOGNIZED_DIAGNOSTIC: &str = "unrecognized diagnostic";

static REGISTRY: &[(u8, u16, &str)] = &[
    (0, 0, "success"),
    // Transfer
    (1, 100, "physical transmission error"),
    (1, 101, "too many unacknowledged sync points"),
    (1, 102, "too much data received without a sync point"),
    (1, 103, "data received does not match the negotiated format"),
    (1, 104, "transfer interrupted by the sender"),
    (1, 105, "transfer interrupted by the receiver"),
    (1, 199, "unspecified transfer error"),
    // File
    (2, 200, "file characteristics incompatible"),
    (2, 201, "local resources temporarily insufficient"),
    (2, 202, "local resources permanently insufficient"),
    (2, 203, "file priority too low"),
    (2, 204, "file already exists"),
    (2, 205, "file does not exist"),
    (2, 206, "space quota exceeded"),
    (2, 207, "file busy"),
    (2, 208, "file too old"),
    (2, 209, "message refused by the receiving application"),
    (2, 210, "data presentation not supported"),
    (2, 211, "file access denied"),
    (2, 212, "invalid file access password"),
    (2, 213, "restart refused: no matching interrupted transfer"),
    (2, 214, "restart refused: restart point unknown"),
    (2, 215, "restart refused: file modified since interruption"),
    (2, 216, "file size exceeds the announced reservation"),
    (2, 217, "record length mismatch"),
    (2, 218, "article format mismatch"),
    (2, 219, "entity size exceeds the negotiated maximum"),
    (2, 220, "another transfer is in progress on this file"),
    (2, 299, "unspecified file error"),
    // Connection
    (3, 300, "connection refused: server saturated"),
    (3, 301, "unknown requester"),
    (3, 302, "requester not authorized"),
    (3, 303, "invalid password"),
    (3, 304, "protocol version not supported"),
    (3, 305, "server unavailable"),
    (3, 306, "resynchronization not supported"),
    (3, 307, "sync point option not supported"),
    (3, 308, "access type not supported"),
    (3, 309, "surveillance timer expired"),
    (3, 310, "too many connections"),
    (3, 311, "protocol error"),
    (3, 399, "unspecified connection error"),
];

impl DiagnosticCode {
    /// Success.
    pub const SUCCESS: Self = Self::new(0, 0);
    /// Transfer interrupted by the sender.
    pub const INTERRUPTED_BY_SENDER: Self = Self::new(1, 104);
    /// File does not exist.
    pub const FILE_NOT_FOUND: Self = Self::new(2, 205);
    /// File access denied.
    pub const ACCESS_DENIED: Self = Self::new(2, 211);
    /// Restart refused: no matching interrupted transfer.
    pub const RESTART_NO_MATCHING_TRANSFER: Self = Self::new(2, 213);
    /// Restart refused: restart point unknown.
    pub const RESTART_POINT_UNKNOWN: Self = Self::new(2, 214);
    /// Unspecified file error.
    pub const FILE_ERROR: Self = Self::new(2, 299);
    /// Unknown requester.
    pub const UNKNOWN_REQUESTER: Self = Self::new(3, 301);
    /// Resynchronization not supported.
    pub const RESYNC_NOT_SUPPORTED: Self = Self::new(3, 306);
    /// Protocol error.
    pub const PROTOCOL_ERROR: Self = Self::new(3, 311);
    /// Unspecified connection error.
    pub const CONNECTION_ERROR: Self = Self::new(3, 399);

    /// Create a diagnostic code.
    pub const fn new(category: u8, reason: u16) -> Self {
        Self { category, reason }
    }

    /// Decode from the 3-byte wire form.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [category, hi, lo] => Some(Self::new(*category, u16::from_be_bytes([*hi, *lo]))),
            _ => None,
        }
    }

    /// Encode to the 3-byte wire form.
    pub fn to_bytes(self) -> [u8; DIAGNOSTIC_SIZE] {
        let [hi, lo] = self.reason.to_be_bytes();
        [self.category, hi, lo]
    }

    /// Check if this is the success code.
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Check if the peer refused to resume a transfer.
    pub fn is_restart_rejection(self) -> bool {
        matches!((self.category, self.reason), (2, 213..=215) | (3, 306))
    }

    /// Check if this code is present in the registry.
    pub fn is_known(self) -> bool {
        lookup(self).is_some()
    }

    /// Human-readable message.
    pub fn message(self) -> &'static str {
        lookup(self).unwrap_or(UNRECOGNIZED_DIAGNOSTIC)
    }
}

impl Default for DiagnosticCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [category, hi, lo] = self.to_bytes();
        write!(f, "0x{category:02X}{hi:02X}{lo:02X} ({})", self.message())
    }
}

fn lookup(code: DiagnosticCode) -> Option<&'static str> {
    REGISTRY
        .iter()
        .find(|(category, reason, _)| *category == code.category && *reason == code.reason)
        .map(|(_, _, message)| *message)
}
