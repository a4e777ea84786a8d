//! Splitting a transport entity into its FPDUs.
//!
//! One entity may hold several back-to-back FPDUs. [`FpduFrames`] walks the
//! entity lazily, in order, and stops at the first fragment whose length
//! prefix is below the header size or runs past the end of the entity.

use tracing::{debug, warn};

use super::codec::{Fpdu, parse, peek_length};
use crate::core::{FPDU_HEADER_SIZE, ParseError};

/// Lazy iterator over the FPDUs contained in one entity.
///
/// A malformed trailing fragment is discarded with a warning. A parse
/// error on a well-delimited FPDU is yielded once, then iteration ends.
#[derive(Debug, Clone)]
pub struct FpduFrames<'a> {
    buf: &'a [u8],
    cursor: usize,
    finished: bool,
}

impl<'a> FpduFrames<'a> {
    /// Iterate over the FPDUs in `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0, finished: false }
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Bytes not yet consumed (including a discarded fragment).
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.cursor..]
    }

    /// Next FPDU together with the bytes it was parsed from.
    pub fn next_with_bytes(&mut self) -> Option<Result<(Fpdu, &'a [u8]), ParseError>> {
        if self.finished {
            return None;
        }
        let remaining = self.remaining();
        if remaining.is_empty() {
            self.finished = true;
            return None;
        }

        let length = match peek_length(remaining) {
            Some(length) if (FPDU_HEADER_SIZE..=remaining.len()).contains(&length) => length,
            declared => {
                warn!(
                    declared = ?declared,
                    remaining = remaining.len(),
                    offset = self.cursor,
                    "discarding invalid trailing fragment"
                );
                self.finished = true;
                return None;
            }
        };

        let frame = &remaining[..length];
        match parse(frame) {
            Ok(fpdu) => {
                self.cursor += length;
                Some(Ok((fpdu, frame)))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl Iterator for FpduFrames<'_> {
    type Item = Result<Fpdu, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with_bytes().map(|item| item.map(|(fpdu, _)| fpdu))
    }
}

/// Split a whole entity into FPDUs.
pub fn split_entity(buf: &[u8]) -> Result<Vec<Fpdu>, ParseError> {
    let fpdus = FpduFrames::new(buf).collect::<Result<Vec<_>, _>>()?;
    debug!(count = fpdus.len(), length = buf.len(), "split entity");
    Ok(fpdus)
}
