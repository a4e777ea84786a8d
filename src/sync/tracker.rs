//! Sender-side sync point tracking
//!
//! Decides when a SYN must precede the next data chunk and when the sender
//! must wait for ACK_SYN before sending more.

use tracing::debug;

use super::negotiation::NegotiatedSync;

/// Sender-side sync state for one transfer
#[derive(Debug, Clone)]
pub struct SyncPointTracker {
    sync: NegotiatedSync,
    /// Bytes sent since the last sync point
    bytes_since_sync: u64,
    /// Total bytes sent in this transfer
    total_bytes: u64,
    /// Last sync number emitted
    last_sync: u32,
    /// Highest sync number acknowledged by the receiver
    last_acked: u32,
}

impl SyncPointTracker {
    /// Create a tracker for the negotiated parameters
    pub fn new(sync: NegotiatedSync) -> Self {
        Self {
            sync,
            bytes_since_sync: 0,
            total_bytes: 0,
            last_sync: 0,
            last_acked: 0,
        }
    }

    /// Negotiated parameters in force
    pub fn negotiated(&self) -> NegotiatedSync {
        self.sync
    }

    /// Account for a chunk about to be sent.
    ///
    /// Returns the number of a sync point that must be emitted *before*
    /// the chunk, when sending it would push the bytes since the last sync
    /// point past the interval.
    pub fn on_chunk(&mut self, len: usize) -> Option<u32> {
        let len = len as u64;
        let mut sync = None;
        if self.sync.is_enabled()
            && self.bytes_since_sync > 0
            && self.bytes_since_sync + len > self.sync.interval_bytes
        {
            self.last_sync += 1;
            self.bytes_since_sync = 0;
            debug!(sync = self.last_sync, total_bytes = self.total_bytes, "sync point due");
            sync = Some(self.last_sync);
        }
        self.bytes_since_sync += len;
        self.total_bytes += len;
        sync
    }

    /// Sync points emitted but not yet acknowledged
    pub fn outstanding(&self) -> u32 {
        self.last_sync - self.last_acked
    }

    /// Check if the window is full and the sender must wait for ACK_SYN
    pub fn must_await_ack(&self) -> bool {
        self.sync.window > 0 && self.outstanding() >= u32::from(self.sync.window)
    }

    /// Record an acknowledgement; returns false for a number never emitted
    pub fn acknowledge(&mut self, sync: u32) -> bool {
        if sync > self.last_sync {
            return false;
        }
        self.last_acked = self.last_acked.max(sync);
        true
    }

    /// Resume numbering after the receiver's restart point.
    ///
    /// The next sync point emitted will be `restart_point + 1`.
    pub fn resume_from(&mut self, restart_point: u32) {
        self.last_sync = restart_point;
        self.last_acked = restart_point;
        self.bytes_since_sync = 0;
        self.total_bytes = self.resume_offset();
    }

    /// Byte offset implied by the last sync number.
    ///
    /// Approximate: `sync number × interval`. The exact byte count at each
    /// sync point is not kept.
    pub fn resume_offset(&self) -> u64 {
        super::restart::resume_offset(self.last_sync, self.sync.interval_bytes)
    }

    /// Last sync number emitted
    pub fn last_sync(&self) -> u32 {
        self.last_sync
    }

    /// Highest acknowledged sync number
    pub fn last_acked(&self) -> u32 {
        self.last_acked
    }

    /// Total bytes accounted for, including the resume offset
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}
