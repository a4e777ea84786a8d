//! Session traffic recording.
//!
//! Keeps every FPDU a session sends or receives, in order, and writes them
//! as one line each for golden-file comparisons:
//!
//! ```text
//! > CONNECT 001240200001030141040142060102160100
//! < ACONNECT 000b402101016303010203
//! ```
//!
//! Lines start with `>` for sent and `<` for received FPDUs, then the
//! FPDU name and its bytes in hex. Blank lines and `#` comments are
//! ignored when loading.

use std::fmt::Write as _;

use thiserror::Error;

use crate::core::ParseError;
use crate::fpdu::{Fpdu, FpduType, parse};

/// Direction of a recorded FPDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by this session.
    Sent,
    /// Received from the peer.
    Received,
}

impl Direction {
    fn marker(self) -> char {
        match self {
            Self::Sent => '>',
            Self::Received => '<',
        }
    }
}

/// One recorded FPDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFpdu {
    /// Direction.
    pub direction: Direction,
    /// FPDU kind.
    pub kind: FpduType,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

impl RecordedFpdu {
    /// Decode the recorded bytes.
    pub fn fpdu(&self) -> Result<Fpdu, ParseError> {
        parse(&self.bytes)
    }
}

/// Errors loading a recording.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// A line does not have the `<dir> <name> <hex>` shape.
    #[error("line {line}: malformed record")]
    Malformed {
        /// 1-based line number.
        line: usize,
    },

    /// The hex payload is invalid.
    #[error("line {line}: {source}")]
    Hex {
        /// 1-based line number.
        line: usize,
        /// Underlying error.
        source: hex::FromHexError,
    },

    /// The bytes do not parse as an FPDU.
    #[error("line {line}: {source}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Underlying error.
        source: ParseError,
    },
}

/// Ordered log of the FPDUs exchanged on a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficRecorder {
    records: Vec<RecordedFpdu>,
}

impl TrafficRecorder {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an FPDU.
    pub fn record(&mut self, direction: Direction, kind: FpduType, bytes: &[u8]) {
        self.records.push(RecordedFpdu {
            direction,
            kind,
            bytes: bytes.to_vec(),
        });
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[RecordedFpdu] {
        &self.records
    }

    /// Kinds exchanged in one direction, in order.
    pub fn kinds(&self, direction: Direction) -> Vec<FpduType> {
        self.records
            .iter()
            .filter(|r| r.direction == direction)
            .map(|r| r.kind)
            .collect()
    }

    /// Render as text, one FPDU per line.
    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            let _ = writeln!(
                out,
                "{} {} {}",
                record.direction.marker(),
                record.kind,
                hex::encode(&record.bytes)
            );
        }
        out
    }

    /// Load a recording produced by [`to_lines`](Self::to_lines).
    ///
    /// The FPDU kind is taken from the bytes, not from the name column.
    pub fn from_lines(text: &str) -> Result<Self, RecordingError> {
        let mut recorder = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut columns = trimmed.split_whitespace();
            let direction = match columns.next() {
                Some(">") => Direction::Sent,
                Some("<") => Direction::Received,
                _ => return Err(RecordingError::Malformed { line }),
            };
            let (Some(_name), Some(payload), None) = (columns.next(), columns.next(), columns.next())
            else {
                return Err(RecordingError::Malformed { line });
            };

            let bytes = hex::decode(payload).map_err(|source| RecordingError::Hex { line, source })?;
            let fpdu = parse(&bytes).map_err(|source| RecordingError::Parse { line, source })?;
            recorder.record(direction, fpdu.kind, &bytes);
        }
        Ok(recorder)
    }
}
