//! PeSIT Protocol - Session Engine
//!
//! The initiator side of a PeSIT connection over a tokio byte stream:
//!
//! - **Engine**: [`Session`], one request and one acknowledgement at a time
//! - **Phases**: [`SessionPhase`] and [`SessionState`] for observability
//! - **Configuration**: [`SessionConfig`]
//! - **Recording**: [`TrafficRecorder`] keeps exact wire bytes for replay

mod config;
mod engine;
mod recorder;
mod state;

pub use config::*;
pub use engine::*;
pub use recorder::*;
pub use state::*;
