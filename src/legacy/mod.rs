//! PeSIT Protocol - Legacy mainframe support
//!
//! EBCDIC conversion and the 24-byte pre-connection handshake some
//! mainframe peers exchange before the first FPDU.

pub mod ebcdic;
mod handshake;

pub use handshake::*;
