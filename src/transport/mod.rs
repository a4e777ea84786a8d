//! PeSIT Protocol - Transport Layer
//!
//! Carries FPDUs over any tokio byte stream (TCP in production, an
//! in-memory duplex in tests):
//!
//! - **Entity framing**: [`read_entity`] / [`write_entity`] with a 2-byte length prefix
//! - **FPDU reader**: [`FpduReader`], a FIFO over entities that may hold several FPDUs
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           Session Engine                │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │   entity framing, FPDU FIFO             │
//! ├─────────────────────────────────────────┤
//! │         TCP / byte stream               │
//! └─────────────────────────────────────────┘
//! ```

mod io;
mod reader;

pub use io::*;
pub use reader::*;
