//! FPDU type catalog.
//!
//! Every FPDU is identified on the wire by a (phase, type) byte pair. The
//! catalog is a static table read concurrently without synchronization.

use std::fmt;

use super::param::ParameterId;

/// Phase byte values.
pub mod phases {
    /// Data transfer (DTF family).
    pub const DATA: u8 = 0x00;
    /// Connection establishment and release.
    pub const CONNECTION: u8 = 0x40;
    /// File selection, opening, and transfer control.
    pub const FILE: u8 = 0xC0;
}

/// Every FPDU kind this engine can build or parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FpduType {
    // Connection
    Connect,
    Aconnect,
    Rconnect,
    Release,
    Relconf,
    Abort,
    // File selection and messages
    Create,
    Select,
    Deselect,
    Open,
    Close,
    Msg,
    MsgDm,
    MsgMm,
    MsgFm,
    AckCreate,
    AckSelect,
    AckDeselect,
    AckOpen,
    AckClose,
    AckMsg,
    // Transfer control
    Read,
    Write,
    Syn,
    DtfEnd,
    Resyn,
    Idt,
    TransEnd,
    AckRead,
    AckWrite,
    AckSyn,
    AckResyn,
    AckIdt,
    AckTransEnd,
    // Data
    Dtf,
    Dtfma,
    Dtfda,
    Dtffa,
}

/// Static description of one FPDU kind.
#[derive(Debug)]
pub struct FpduDescriptor {
    /// The kind described.
    pub kind: FpduType,
    /// Phase byte.
    pub phase: u8,
    /// Type byte within the phase.
    pub code: u8,
    /// Upper-case protocol name.
    pub name: &'static str,
    /// Parameters that must be present when building.
    pub mandatory: &'static [ParameterId],
    /// Acknowledgements that may answer this FPDU.
    pub responses: &'static [FpduType],
}

use phases::{CONNECTION, DATA, FILE};
use FpduType::*;
use ParameterId as P;

const DIAG: &[ParameterId] = &[P::Diagnostic];
const NONE: &[ParameterId] = &[];
const NO_ACK: &[FpduType] = &[];

macro_rules! fpdu {
    ($kind:ident, $phase:expr, $code:expr, $name:literal, $mandatory:expr, $responses:expr) => {
        FpduDescriptor {
            kind: $kind,
            phase: $phase,
            code: $code,
            name: $name,
            mandatory: $mandatory,
            responses: $responses,
        }
    };
}

/// The FPDU catalog.
pub static CATALOG: [FpduDescriptor; 38] = [
    fpdu!(Connect, CONNECTION, 0x20, "CONNECT", &[P::Requester, P::Server, P::Version, P::AccessType], &[Aconnect, Rconnect]),
    fpdu!(Aconnect, CONNECTION, 0x21, "ACONNECT", NONE, NO_ACK),
    fpdu!(Rconnect, CONNECTION, 0x22, "RCONNECT", DIAG, NO_ACK),
    fpdu!(Release, CONNECTION, 0x23, "RELEASE", DIAG, &[Relconf]),
    fpdu!(Relconf, CONNECTION, 0x24, "RELCONF", NONE, NO_ACK),
    fpdu!(Abort, CONNECTION, 0x25, "ABORT", DIAG, NO_ACK),
    fpdu!(Create, FILE, 0x11, "CREATE", &[P::Filename, P::TransferId], &[AckCreate]),
    fpdu!(Select, FILE, 0x12, "SELECT", &[P::Filename], &[AckSelect]),
    fpdu!(Deselect, FILE, 0x13, "DESELECT", DIAG, &[AckDeselect]),
    fpdu!(Open, FILE, 0x14, "OPEN", NONE, &[AckOpen]),
    fpdu!(Close, FILE, 0x15, "CLOSE", DIAG, &[AckClose]),
    fpdu!(Msg, FILE, 0x16, "MSG", NONE, &[AckMsg]),
    fpdu!(MsgDm, FILE, 0x17, "MSGDM", NONE, NO_ACK),
    fpdu!(MsgMm, FILE, 0x18, "MSGMM", NONE, NO_ACK),
    fpdu!(MsgFm, FILE, 0x19, "MSGFM", NONE, &[AckMsg]),
    fpdu!(AckCreate, FILE, 0x30, "ACK_CREATE", DIAG, NO_ACK),
    fpdu!(AckSelect, FILE, 0x31, "ACK_SELECT", DIAG, NO_ACK),
    fpdu!(AckDeselect, FILE, 0x32, "ACK_DESELECT", DIAG, NO_ACK),
    fpdu!(AckOpen, FILE, 0x33, "ACK_OPEN", DIAG, NO_ACK),
    fpdu!(AckClose, FILE, 0x34, "ACK_CLOSE", DIAG, NO_ACK),
    fpdu!(AckMsg, FILE, 0x35, "ACK_MSG", DIAG, NO_ACK),
    fpdu!(Read, FILE, 0x01, "READ", &[P::RestartPoint], &[AckRead]),
    fpdu!(Write, FILE, 0x02, "WRITE", NONE, &[AckWrite]),
    fpdu!(Syn, FILE, 0x03, "SYN", &[P::SyncNumber], &[AckSyn]),
    fpdu!(DtfEnd, FILE, 0x04, "DTF_END", DIAG, NO_ACK),
    fpdu!(Resyn, FILE, 0x05, "RESYN", &[P::SyncNumber], &[AckResyn]),
    fpdu!(Idt, FILE, 0x06, "IDT", DIAG, &[AckIdt]),
    fpdu!(TransEnd, FILE, 0x08, "TRANS_END", NONE, &[AckTransEnd]),
    fpdu!(AckRead, FILE, 0x21, "ACK_READ", DIAG, NO_ACK),
    fpdu!(AckWrite, FILE, 0x22, "ACK_WRITE", DIAG, NO_ACK),
    fpdu!(AckSyn, FILE, 0x23, "ACK_SYN", &[P::SyncNumber], NO_ACK),
    fpdu!(AckResyn, FILE, 0x25, "ACK_RESYN", &[P::SyncNumber], NO_ACK),
    fpdu!(AckIdt, FILE, 0x26, "ACK_IDT", NONE, NO_ACK),
    fpdu!(AckTransEnd, FILE, 0x28, "ACK_TRANS_END", DIAG, NO_ACK),
    fpdu!(Dtf, DATA, 0x00, "DTF", NONE, NO_ACK),
    fpdu!(Dtfma, DATA, 0x40, "DTFMA", NONE, NO_ACK),
    fpdu!(Dtfda, DATA, 0x41, "DTFDA", NONE, NO_ACK),
    fpdu!(Dtffa, DATA, 0x42, "DTFFA", NONE, NO_ACK),
];

impl FpduType {
    /// Look up a kind by its wire (phase, type) pair.
    pub fn from_codes(phase: u8, code: u8) -> Option<Self> {
        CATALOG
            .iter()
            .find(|d| d.phase == phase && d.code == code)
            .map(|d| d.kind)
    }

    /// Catalog entry for this kind.
    pub fn descriptor(self) -> &'static FpduDescriptor {
        // The catalog lists kinds in declaration order.
        &CATALOG[self as usize]
    }

    /// Phase byte.
    pub fn phase(self) -> u8 {
        self.descriptor().phase
    }

    /// Type byte within the phase.
    pub fn code(self) -> u8 {
        self.descriptor().code
    }

    /// Protocol name, e.g. `ACK_WRITE`.
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Parameters required when building this kind.
    pub fn mandatory_parameters(self) -> &'static [ParameterId] {
        self.descriptor().mandatory
    }

    /// Acknowledgements that may answer this kind (empty if none).
    pub fn expected_responses(self) -> &'static [FpduType] {
        self.descriptor().responses
    }

    /// Check if this kind is acknowledged by the peer.
    pub fn is_acknowledged(self) -> bool {
        !self.expected_responses().is_empty()
    }

    /// Check if this kind belongs to the DTF family (raw data payload).
    pub fn is_data(self) -> bool {
        matches!(self, Dtf | Dtfma | Dtfda | Dtffa)
    }

    /// Check if this kind terminates the connection unilaterally.
    pub fn is_abort(self) -> bool {
        matches!(self, Abort)
    }
}

impl fmt::Display for FpduType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
