//! Parameter model: PI and PGI catalogs and their TLV encoding.
//!
//! Single parameter wire format:
//! ```text
//! +------+---------+---------------+
//! |  id  | len (1) |     value     |     len <= 254
//! +------+---------+---------------+
//! |  id  |  0xFF   | len (2, BE)   | value |   len > 254
//! +------+---------+---------------+-------+
//! ```
//!
//! A group (PGI) is a group id, a length covering the whole nested TLV
//! sequence, then the nested parameters. Groups do not nest.

use tracing::trace;

use crate::core::{EXTENDED_LENGTH_MARKER, MAX_SHORT_PARAMETER_LENGTH, ParameterError};

macro_rules! parameter_ids {
    ($( $(#[$doc:meta])* $variant:ident = $code:literal, $name:literal, $width:expr; )*) => {
        /// Parameter identifiers (PI).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum ParameterId {
            $( $(#[$doc])* $variant = $code, )*
        }

        impl ParameterId {
            /// Every known parameter identifier.
            pub const ALL: &'static [ParameterId] = &[$(ParameterId::$variant),*];

            /// Parse a parameter identifier from a byte.
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $( $code => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// Protocol name, e.g. `PI_12_FILENAME`.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )*
                }
            }

            /// Fixed wire width of numeric values, if the parameter is numeric.
            pub fn numeric_width(self) -> Option<usize> {
                match self {
                    $( Self::$variant => $width, )*
                }
            }
        }
    };
}

parameter_ids! {
    /// CRC usage flag.
    Crc = 1, "PI_01_CRC", Some(1);
    /// Diagnostic code (3 bytes).
    Diagnostic = 2, "PI_02_DIAG", None;
    /// Requester identification.
    Requester = 3, "PI_03_REQUESTER", None;
    /// Server identification.
    Server = 4, "PI_04_SERVER", None;
    /// Access control (password).
    AccessControl = 5, "PI_05_ACCESS_CONTROL", None;
    /// Protocol version.
    Version = 6, "PI_06_VERSION", Some(1);
    /// Sync-points descriptor: interval KB (2) + window (1).
    SyncPoints = 7, "PI_07_SYNC_POINTS", None;
    /// File type.
    FileType = 11, "PI_11_FILE_TYPE", Some(2);
    /// File name.
    Filename = 12, "PI_12_FILENAME", None;
    /// Transfer identifier.
    TransferId = 13, "PI_13_TRANSFER_ID", Some(3);
    /// Requested attributes.
    RequestedAttributes = 14, "PI_14_REQUESTED_ATTRIBUTES", Some(1);
    /// Restarted transfer flag.
    RestartFlag = 15, "PI_15_RESTART", Some(1);
    /// Data code (ASCII, EBCDIC, binary).
    DataCode = 16, "PI_16_DATA_CODE", Some(1);
    /// Transfer priority.
    Priority = 17, "PI_17_PRIORITY", Some(1);
    /// Restart point (sync number).
    RestartPoint = 18, "PI_18_RESTART_POINT", Some(3);
    /// End-of-transfer code.
    EndOfTransferCode = 19, "PI_19_END_CODE", Some(1);
    /// Sync point number.
    SyncNumber = 20, "PI_20_SYNC_NUMBER", Some(3);
    /// Compression.
    Compression = 21, "PI_21_COMPRESSION", None;
    /// Access type: write, read, or mixed.
    AccessType = 22, "PI_22_ACCESS_TYPE", Some(1);
    /// Resynchronization enabled.
    Resync = 23, "PI_23_RESYNC", Some(1);
    /// Maximum data entity size.
    MaxEntitySize = 25, "PI_25_MAX_ENTITY_SIZE", Some(2);
    /// Surveillance timer.
    SurveillanceTimer = 26, "PI_26_TIMEOUT", Some(2);
    /// Number of bytes transferred.
    ByteCount = 27, "PI_27_BYTE_COUNT", Some(8);
    /// Number of articles transferred.
    ArticleCount = 28, "PI_28_ARTICLE_COUNT", Some(4);
    /// Diagnostic complement (free text).
    DiagnosticComplement = 29, "PI_29_DIAG_COMPLEMENT", None;
    /// Article format (fixed or variable).
    ArticleFormat = 31, "PI_31_ARTICLE_FORMAT", Some(1);
    /// Record (article) length.
    RecordLength = 32, "PI_32_RECORD_LENGTH", Some(2);
    /// File organization.
    FileOrganization = 33, "PI_33_FILE_ORGANIZATION", Some(1);
    /// Space reservation unit.
    ReservationUnit = 41, "PI_41_RESERVATION_UNIT", Some(1);
    /// Maximum space reservation.
    MaxReservation = 42, "PI_42_MAX_RESERVATION", Some(4);
    /// File creation date and time.
    CreationDate = 51, "PI_51_CREATION_DATE", None;
    /// File extraction date and time.
    ExtractionDate = 52, "PI_52_EXTRACTION_DATE", None;
    /// Client identifier.
    ClientId = 61, "PI_61_CLIENT_ID", None;
    /// Bank identifier.
    BankId = 62, "PI_62_BANK_ID", None;
    /// Free message text.
    FreeMessage = 99, "PI_99_FREE_MESSAGE", None;
}

/// Parameter group identifiers (PGI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParameterGroupId {
    /// File identification: file type and filename.
    FileId = 9,
    /// Logical attributes: article format, record length, organization.
    LogicalAttributes = 30,
    /// Physical attributes: reservation unit and maximum.
    PhysicalAttributes = 40,
    /// Historical attributes: creation and extraction dates.
    History = 50,
}

impl ParameterGroupId {
    /// Parse a group identifier from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            9 => Some(Self::FileId),
            30 => Some(Self::LogicalAttributes),
            40 => Some(Self::PhysicalAttributes),
            50 => Some(Self::History),
            _ => None,
        }
    }

    /// Protocol name, e.g. `PGI_09_FILE_ID`.
    pub fn name(self) -> &'static str {
        match self {
            Self::FileId => "PGI_09_FILE_ID",
            Self::LogicalAttributes => "PGI_30_LOGICAL_ATTRIBUTES",
            Self::PhysicalAttributes => "PGI_40_PHYSICAL_ATTRIBUTES",
            Self::History => "PGI_50_HISTORY",
        }
    }

    /// Parameters that belong in this group.
    pub fn members(self) -> &'static [ParameterId] {
        use ParameterId as P;
        match self {
            Self::FileId => &[P::FileType, P::Filename],
            Self::LogicalAttributes => &[P::ArticleFormat, P::RecordLength, P::FileOrganization],
            Self::PhysicalAttributes => &[P::ReservationUnit, P::MaxReservation],
            Self::History => &[P::CreationDate, P::ExtractionDate],
        }
    }
}

/// A single parameter: identifier and raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Identifier.
    pub id: ParameterId,
    /// Raw value.
    pub value: Vec<u8>,
}

impl Parameter {
    /// Parameter with a raw byte value.
    pub fn bytes(id: ParameterId, value: impl Into<Vec<u8>>) -> Self {
        Self { id, value: value.into() }
    }

    /// Parameter with an ASCII string value.
    pub fn string(id: ParameterId, value: &str) -> Self {
        Self::bytes(id, value.as_bytes())
    }

    /// Parameter with a big-endian numeric value.
    ///
    /// Uses the identifier's fixed width, widened if the value does not fit.
    pub fn numeric(id: ParameterId, value: u64) -> Self {
        let minimal = minimal_width(value);
        let width = id.numeric_width().unwrap_or(minimal).max(minimal);
        Self::bytes(id, value.to_be_bytes()[8 - width..].to_vec())
    }

    /// Read the value as a big-endian unsigned integer.
    ///
    /// Returns `None` for empty values or values wider than 8 bytes.
    pub fn as_u64(&self) -> Option<u64> {
        if self.value.is_empty() || self.value.len() > 8 {
            return None;
        }
        Some(self.value.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Read the value as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// Encoded size including id and length bytes.
    pub fn encoded_len(&self) -> usize {
        header_len(self.value.len()) + self.value.len()
    }

    /// Append the TLV encoding to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        encode_header(buf, self.id as u8, self.value.len());
        buf.extend_from_slice(&self.value);
    }
}

/// A parameter group and its flat list of members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterGroup {
    /// Group identifier.
    pub id: ParameterGroupId,
    /// Nested parameters, in wire order.
    pub members: Vec<Parameter>,
}

impl ParameterGroup {
    /// Create a group from its members.
    pub fn new(id: ParameterGroupId, members: Vec<Parameter>) -> Self {
        Self { id, members }
    }

    /// Find a member by identifier.
    pub fn get(&self, id: ParameterId) -> Option<&Parameter> {
        self.members.iter().find(|p| p.id == id)
    }

    fn body_len(&self) -> usize {
        self.members.iter().map(Parameter::encoded_len).sum()
    }
}

/// A top-level FPDU parameter: either a single PI or a PGI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// Single parameter.
    Single(Parameter),
    /// Parameter group.
    Group(ParameterGroup),
}

impl From<Parameter> for ParameterValue {
    fn from(parameter: Parameter) -> Self {
        Self::Single(parameter)
    }
}

impl From<ParameterGroup> for ParameterValue {
    fn from(group: ParameterGroup) -> Self {
        Self::Group(group)
    }
}

impl ParameterValue {
    /// Raw identifier byte (PI or PGI).
    pub fn code(&self) -> u8 {
        match self {
            Self::Single(p) => p.id as u8,
            Self::Group(g) => g.id as u8,
        }
    }

    /// Find a parameter by identifier, here or inside this group.
    pub fn find(&self, id: ParameterId) -> Option<&Parameter> {
        match self {
            Self::Single(p) if p.id == id => Some(p),
            Self::Single(_) => None,
            Self::Group(g) => g.get(id),
        }
    }

    /// Encoded size including id and length bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Single(p) => p.encoded_len(),
            Self::Group(g) => {
                let body = g.body_len();
                header_len(body) + body
            }
        }
    }

    /// Append the TLV encoding to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Single(p) => p.encode_into(buf),
            Self::Group(g) => {
                encode_header(buf, g.id as u8, g.body_len());
                for member in &g.members {
                    member.encode_into(buf);
                }
            }
        }
    }

    /// Encode to a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Decode one parameter or group from the start of `buf`.
    ///
    /// `context` names the enclosing FPDU for error reporting. Returns the
    /// value and the number of bytes consumed.
    pub fn decode(buf: &[u8], context: &str) -> Result<(Self, usize), ParameterError> {
        let (code, header, length) = decode_header(buf)?;
        let value = &buf[header..header + length];

        if let Some(id) = ParameterId::from_byte(code) {
            trace!(parameter = id.name(), length, "decoded parameter");
            return Ok((Self::Single(Parameter::bytes(id, value)), header + length));
        }

        if let Some(id) = ParameterGroupId::from_byte(code) {
            let members = decode_group_members(value, id)?;
            trace!(group = id.name(), members = members.len(), "decoded group");
            return Ok((Self::Group(ParameterGroup::new(id, members)), header + length));
        }

        Err(ParameterError::UnknownParameter {
            id: code,
            length,
            context: context.to_string(),
        })
    }
}

fn decode_group_members(
    mut body: &[u8],
    group: ParameterGroupId,
) -> Result<Vec<Parameter>, ParameterError> {
    let mut members = Vec::new();
    while !body.is_empty() {
        let (code, header, length) = decode_header(body)?;
        let id = ParameterId::from_byte(code).ok_or_else(|| ParameterError::UnknownParameter {
            id: code,
            length,
            context: format!("PGI {}", group.name()),
        })?;
        members.push(Parameter::bytes(id, &body[header..header + length]));
        body = &body[header + length..];
    }
    Ok(members)
}

/// Read `(id, header length, value length)` and check the value is present.
fn decode_header(buf: &[u8]) -> Result<(u8, usize, usize), ParameterError> {
    let (&id, rest) = buf
        .split_first()
        .ok_or(ParameterError::TruncatedLength { id: 0 })?;
    let (&short, rest) = rest
        .split_first()
        .ok_or(ParameterError::TruncatedLength { id })?;

    let (header, length) = if short == EXTENDED_LENGTH_MARKER {
        match rest {
            [hi, lo, ..] => (4, usize::from(u16::from_be_bytes([*hi, *lo]))),
            _ => return Err(ParameterError::TruncatedLength { id }),
        }
    } else {
        (2, usize::from(short))
    };

    let available = buf.len() - header;
    if length > available {
        return Err(ParameterError::TruncatedValue {
            id,
            declared: length,
            available,
        });
    }
    Ok((id, header, length))
}

fn header_len(value_len: usize) -> usize {
    if value_len > MAX_SHORT_PARAMETER_LENGTH { 4 } else { 2 }
}

fn encode_header(buf: &mut Vec<u8>, id: u8, value_len: usize) {
    buf.push(id);
    if value_len > MAX_SHORT_PARAMETER_LENGTH {
        buf.push(EXTENDED_LENGTH_MARKER);
        // Callers bound total FPDU size to 65535 before this can overflow.
        buf.extend_from_slice(&(value_len as u16).to_be_bytes());
    } else {
        buf.push(value_len as u8);
    }
}

fn minimal_width(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}
