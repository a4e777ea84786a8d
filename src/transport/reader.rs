//! Buffered async FPDU reader.
//!
//! Reads one entity at a time from the stream, splits it into FPDUs, and
//! hands them out in order from a FIFO. The FIFO is drained before the
//! stream is touched again.

use std::collections::VecDeque;
use std::io;

use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::io::read_entity;
use crate::core::{ParseError, PesitResult};
use crate::fpdu::{Fpdu, FpduFrames};
use crate::legacy::PreConnection;

/// First message received on a responder-side connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opening {
    /// The legacy 24-byte EBCDIC pre-connection message.
    PreConnection(PreConnection),
    /// A regular FPDU (normally CONNECT).
    Fpdu(Fpdu),
}

/// Reads FPDUs from an entity-framed byte stream.
#[derive(Debug)]
pub struct FpduReader<R> {
    inner: R,
    /// Parsed FPDUs with the bytes they came from. A parse error takes its
    /// place in the queue after the FPDUs that preceded it.
    pending: VecDeque<Result<(Fpdu, Vec<u8>), ParseError>>,
}

impl<R: AsyncRead + Unpin> FpduReader<R> {
    /// Wrap a stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: VecDeque::new(),
        }
    }

    /// Next FPDU, reading more entities only when the FIFO is empty.
    pub async fn read(&mut self) -> PesitResult<Fpdu> {
        self.read_with_bytes().await.map(|(fpdu, _)| fpdu)
    }

    /// Next FPDU and its exact wire bytes.
    pub async fn read_with_bytes(&mut self) -> PesitResult<(Fpdu, Vec<u8>)> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return frame.map_err(Into::into);
            }
            let entity = read_entity(&mut self.inner).await?;
            self.inject(&entity);
        }
    }

    /// Queue the FPDUs contained in bytes obtained out of band.
    ///
    /// A parse error is queued behind the FPDUs that precede it and is
    /// returned by [`read`](Self::read) once they have been delivered.
    /// Returns how many FPDUs were queued.
    pub fn inject(&mut self, entity: &[u8]) -> usize {
        let mut queued = 0;
        let mut frames = FpduFrames::new(entity);
        while let Some(frame) = frames.next_with_bytes() {
            match frame {
                Ok((fpdu, bytes)) => {
                    self.pending.push_back(Ok((fpdu, bytes.to_vec())));
                    queued += 1;
                }
                Err(err) => {
                    warn!(queued, %err, "entity holds an unparsable FPDU");
                    self.pending.push_back(Err(err));
                }
            }
        }
        if queued > 1 {
            debug!(queued, "entity carried several FPDUs");
        }
        queued
    }

    /// Check if parsed FPDUs or a deferred parse error are waiting in the FIFO.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Read one raw entity, bypassing the FIFO.
    pub async fn read_raw(&mut self) -> io::Result<Vec<u8>> {
        read_entity(&mut self.inner).await
    }

    /// Read the first message of a responder-side connection.
    ///
    /// Recognizes the legacy pre-connection message; anything else is
    /// parsed as FPDUs.
    pub async fn read_opening(&mut self) -> PesitResult<Opening> {
        let entity = self.read_raw().await?;
        if let Some(pre_connection) = PreConnection::parse(&entity) {
            info!(identifier = %pre_connection.identifier, "legacy pre-connection received");
            return Ok(Opening::PreConnection(pre_connection));
        }
        self.inject(&entity);
        self.read().await.map(Opening::Fpdu)
    }

    /// Mutable access to the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the stream. Queued FPDUs are dropped.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
