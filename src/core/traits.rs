//! Core traits for PeSIT message construction.

use crate::fpdu::{Fpdu, FpduType, ParameterValue};

/// A request whose configuration maps to one outgoing FPDU.
///
/// Implementors are plain configuration structs. `parameters` MUST return
/// the parameters in wire order: some peers parse connection messages
/// positionally rather than by tag.
///
/// # Example
///
/// ```
/// use pesit_protocol::core::FpduRequest;
/// use pesit_protocol::fpdu::{FpduType, Parameter, ParameterId, ParameterValue};
///
/// struct Ping;
///
/// impl FpduRequest for Ping {
///     const KIND: FpduType = FpduType::Msg;
///
///     fn parameters(&self) -> Vec<ParameterValue> {
///         vec![Parameter::string(ParameterId::FreeMessage, "ping").into()]
///     }
/// }
///
/// let fpdu = Ping.to_fpdu(1, 2);
/// assert_eq!(fpdu.kind, FpduType::Msg);
/// assert_eq!(fpdu.parameters().len(), 1);
/// ```
pub trait FpduRequest {
    /// FPDU type this request is sent as.
    const KIND: FpduType;

    /// Parameters in wire order.
    fn parameters(&self) -> Vec<ParameterValue>;

    /// Build the FPDU addressed from `id_src` to `id_dst`.
    fn to_fpdu(&self, id_dst: u8, id_src: u8) -> Fpdu {
        Fpdu::with_parameters(Self::KIND, id_dst, id_src, self.parameters())
    }
}
