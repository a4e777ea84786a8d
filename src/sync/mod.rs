//! PeSIT Protocol - Sync and restart
//!
//! Implements:
//! - Sync-point negotiation (responder's interval and window are authoritative)
//! - The send-side rule: a SYN goes out *before* a chunk that would cross the interval
//! - Receive-side sync validation and ACK_SYN decisions
//! - Restart points and the approximate resume offset

mod negotiation;
mod receiver;
mod restart;
mod tracker;

pub use negotiation::*;
pub use receiver::*;
pub use restart::*;
pub use tracker::*;
