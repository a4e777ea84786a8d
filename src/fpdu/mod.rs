//! PeSIT Protocol - FPDU layer
//!
//! Sans-IO building blocks for PeSIT protocol data units:
//!
//! - **Parameter model**: [`ParameterId`], [`ParameterGroupId`], and TLV encoding
//! - **FPDU catalog**: [`FpduType`] with wire codes, mandatory parameters, and acknowledgements
//! - **Diagnostic registry**: [`DiagnosticCode`]
//! - **Codec**: [`build`], [`parse`], and multi-article packing
//! - **Frame splitting**: [`FpduFrames`] over one transport entity
//! - **Requests**: configuration structs for CONNECT, CREATE, SELECT, and READ

mod codec;
mod diagnostic;
mod frames;
mod kind;
mod param;
mod request;

pub use codec::*;
pub use diagnostic::*;
pub use frames::*;
pub use kind::{FpduDescriptor, FpduType, CATALOG, phases};
pub use param::*;
pub use request::*;
