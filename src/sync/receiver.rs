//! Receiver-side sync point handling
//!
//! Checks that incoming SYN numbers follow each other and decides which
//! ones must be answered with ACK_SYN.

use tracing::{debug, warn};

use super::negotiation::NegotiatedSync;

/// Outcome of an incoming SYN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReceipt {
    /// Accepted; answer with ACK_SYN carrying this number
    Acknowledge(u32),
    /// Accepted; the window is 0 so no acknowledgement is sent
    Silent(u32),
    /// Number does not follow the previous sync point
    OutOfOrder {
        /// Number that was expected
        expected: u32,
        /// Number received
        actual: u32,
    },
}

/// Receiver-side sync state for one transfer
#[derive(Debug, Clone)]
pub struct SyncPointReceiver {
    sync: NegotiatedSync,
    last_sync: u32,
    bytes_since_sync: u64,
    total_bytes: u64,
}

impl SyncPointReceiver {
    /// Create a receiver for the negotiated parameters
    pub fn new(sync: NegotiatedSync) -> Self {
        Self {
            sync,
            last_sync: 0,
            bytes_since_sync: 0,
            total_bytes: 0,
        }
    }

    /// Account for received data
    pub fn on_data(&mut self, len: usize) {
        self.bytes_since_sync += len as u64;
        self.total_bytes += len as u64;
        if self.sync.is_enabled() && self.bytes_since_sync > 2 * self.sync.interval_bytes {
            warn!(
                bytes_since_sync = self.bytes_since_sync,
                interval = self.sync.interval_bytes,
                "sender is not emitting sync points"
            );
        }
    }

    /// Handle an incoming SYN
    pub fn on_sync(&mut self, sync: u32) -> SyncReceipt {
        let expected = self.last_sync + 1;
        if sync != expected {
            return SyncReceipt::OutOfOrder { expected, actual: sync };
        }
        self.last_sync = sync;
        self.bytes_since_sync = 0;
        debug!(sync, total_bytes = self.total_bytes, "sync point received");

        if self.sync.window == 0 {
            SyncReceipt::Silent(sync)
        } else {
            SyncReceipt::Acknowledge(sync)
        }
    }

    /// Resume after a restart at `restart_point`
    pub fn resume_from(&mut self, restart_point: u32) {
        self.last_sync = restart_point;
        self.bytes_since_sync = 0;
        self.total_bytes = super::restart::resume_offset(restart_point, self.sync.interval_bytes);
    }

    /// Last sync number received; the restart point to report after a failure
    pub fn last_sync(&self) -> u32 {
        self.last_sync
    }

    /// Total bytes received, including the resume offset
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(window: u8) -> NegotiatedSync {
        NegotiatedSync { interval_bytes: 1024, window }
    }

    #[test]
    fn test_in_order_syncs_acknowledged() {
        let mut r = SyncPointReceiver::new(enabled(1));
        r.on_data(1000);
        assert_eq!(r.on_sync(1), SyncReceipt::Acknowledge(1));
        r.on_data(1000);
        assert_eq!(r.on_sync(2), SyncReceipt::Acknowledge(2));
        assert_eq!(r.last_sync(), 2);
        assert_eq!(r.total_bytes(), 2000);
    }

    #[test]
    fn test_out_of_order() {
        let mut r = SyncPointReceiver::new(enabled(1));
        assert_eq!(r.on_sync(2), SyncReceipt::OutOfOrder { expected: 1, actual: 2 });
        assert_eq!(r.on_sync(1), SyncReceipt::Acknowledge(1));
        assert_eq!(r.on_sync(1), SyncReceipt::OutOfOrder { expected: 2, actual: 1 });
    }

    #[test]
    fn test_window_zero_is_silent() {
        let mut r = SyncPointReceiver::new(enabled(0));
        assert_eq!(r.on_sync(1), SyncReceipt::Silent(1));
    }

    #[test]
    fn test_resume() {
        let mut r = SyncPointReceiver::new(enabled(1));
        r.resume_from(2);
        assert_eq!(r.total_bytes(), 2048);
        assert_eq!(r.on_sync(3), SyncReceipt::Acknowledge(3));
    }
}
