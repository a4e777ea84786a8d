//! PeSIT Protocol - Core constants, error types, and traits.
//!
//! Foundation shared by the codec, sync, transport, and session layers.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
