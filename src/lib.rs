//! # PeSIT Protocol
//!
//! A protocol engine for PeSIT, the banking file-transfer protocol.
//!
//! PeSIT exchanges FPDUs (binary protocol data units) over a byte stream.
//! A connection is established, a file is created or selected and opened,
//! data flows in DTF FPDUs interleaved with numbered sync points, and an
//! interrupted transfer resumes from the last acknowledged sync point.
//!
//! ## Feature Flags
//!
//! - `transport` (default): entity framing and the FPDU reader over tokio streams
//! - `session` (default): the initiator-side [`Session`] engine (implies `transport`)
//!
//! ## Modules
//!
//! - [`core`]: constants, error types and the request trait (always included)
//! - [`fpdu`]: FPDU catalog, parameters, diagnostics and the codec (always included)
//! - [`sync`]: sync-point negotiation, tracking and restart (always included)
//! - [`legacy`]: EBCDIC and the pre-connection handshake (always included)
//! - [`transport`]: entity framing (requires `transport` feature)
//! - [`session`]: the session engine (requires `session` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use pesit_protocol::prelude::*;
//!
//! let connect = ConnectRequest::new("CLIENT", "SERVER").to_fpdu(0, 1);
//! let bytes = connect.encode()?;
//!
//! let parsed = parse(&bytes)?;
//! assert_eq!(parsed.kind, FpduType::Connect);
//! assert_eq!((parsed.id_dst, parsed.id_src), (0, 1));
//! assert_eq!(parsed.numeric(ParameterId::Version), Some(2));
//! # Ok::<(), PesitError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Always included
pub mod core;
pub mod fpdu;
pub mod legacy;
pub mod sync;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Session engine (feature-gated)
#[cfg(feature = "session")]
#[cfg_attr(docsrs, doc(cfg(feature = "session")))]
pub mod session;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::fpdu::*;
    pub use crate::legacy::{ACK0, PreConnection, is_ack0, is_pre_connection};
    pub use crate::sync::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::{FpduReader, Opening, read_entity, write_entity, write_fpdus};

    #[cfg(feature = "session")]
    pub use crate::session::*;
}

// Re-export commonly used items at crate root
pub use self::core::{PesitError, PesitResult};
pub use fpdu::{DiagnosticCode, Fpdu, FpduType, ParameterId, build, parse};

#[cfg(feature = "session")]
pub use session::{DataEvent, Session, SessionConfig};
