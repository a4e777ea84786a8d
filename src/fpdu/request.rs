//! Request configuration structs for outgoing FPDUs.
//!
//! Each struct holds the negotiable values of one request and produces its
//! parameters in wire order through [`FpduRequest`].

use super::kind::FpduType;
use super::param::{Parameter, ParameterGroup, ParameterGroupId, ParameterId, ParameterValue};
use crate::core::{DEFAULT_MAX_ENTITY_SIZE, DEFAULT_RECORD_LENGTH, FpduRequest, PROTOCOL_VERSION};
use crate::sync::SyncPointsDescriptor;

/// Access type requested on CONNECT (PI 22).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AccessType {
    /// The initiator sends files.
    #[default]
    Write = 0,
    /// The initiator receives files.
    Read = 1,
    /// Both directions.
    Mixed = 2,
}

impl AccessType {
    /// Parse an access type from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Write),
            1 => Some(Self::Read),
            2 => Some(Self::Mixed),
            _ => None,
        }
    }
}

/// CONNECT configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Requester identification (PI 3).
    pub requester: String,
    /// Server identification (PI 4).
    pub server: String,
    /// Access password (PI 5).
    pub password: Option<String>,
    /// Proposed sync points (PI 7); `None` does not offer sync points.
    pub sync_points: Option<SyncPointsDescriptor>,
    /// Access type (PI 22).
    pub access: AccessType,
    /// Offer resynchronization (PI 23).
    pub resync: bool,
}

impl ConnectRequest {
    /// Write access, no password, no sync points, no resync.
    pub fn new(requester: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            requester: requester.into(),
            server: server.into(),
            password: None,
            sync_points: None,
            access: AccessType::Write,
            resync: false,
        }
    }
}

impl FpduRequest for ConnectRequest {
    const KIND: FpduType = FpduType::Connect;

    fn parameters(&self) -> Vec<ParameterValue> {
        // Some peers read these positionally: the order is part of the wire format.
        let mut parameters = vec![
            Parameter::string(ParameterId::Requester, &self.requester).into(),
            Parameter::string(ParameterId::Server, &self.server).into(),
        ];
        if let Some(password) = &self.password {
            parameters.push(Parameter::string(ParameterId::AccessControl, password).into());
        }
        parameters.push(Parameter::numeric(ParameterId::Version, u64::from(PROTOCOL_VERSION)).into());
        if let Some(sync_points) = &self.sync_points {
            parameters.push(sync_points.to_parameter().into());
        }
        parameters.push(Parameter::numeric(ParameterId::AccessType, self.access as u64).into());
        if self.resync {
            parameters.push(Parameter::numeric(ParameterId::Resync, 1).into());
        }
        parameters
    }
}

/// CREATE configuration (send a file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Virtual file name (PI 12).
    pub filename: String,
    /// Transfer identifier (PI 13); reuse it when restarting.
    pub transfer_id: u32,
    /// File type (PI 11).
    pub file_type: u16,
    /// Variable-length articles (PI 31).
    pub variable_format: bool,
    /// Record length (PI 32).
    pub record_length: u16,
    /// Maximum entity size (PI 25).
    pub max_entity_size: u16,
    /// Announced file size in KB (PI 42), if known.
    pub file_size_kb: Option<u32>,
    /// Priority (PI 17).
    pub priority: u8,
    /// Resume an interrupted transfer (PI 15).
    pub restart: bool,
}

impl CreateRequest {
    /// Fresh transfer with default attributes.
    pub fn new(filename: impl Into<String>, transfer_id: u32) -> Self {
        Self {
            filename: filename.into(),
            transfer_id,
            file_type: 0,
            variable_format: false,
            record_length: DEFAULT_RECORD_LENGTH,
            max_entity_size: DEFAULT_MAX_ENTITY_SIZE,
            file_size_kb: None,
            priority: 0,
            restart: false,
        }
    }
}

impl FpduRequest for CreateRequest {
    const KIND: FpduType = FpduType::Create;

    fn parameters(&self) -> Vec<ParameterValue> {
        let mut parameters = vec![
            file_id(self.file_type, &self.filename),
            Parameter::numeric(ParameterId::TransferId, u64::from(self.transfer_id)).into(),
            Parameter::numeric(ParameterId::RequestedAttributes, 0).into(),
        ];
        if self.restart {
            parameters.push(Parameter::numeric(ParameterId::RestartFlag, 1).into());
        }
        parameters.push(Parameter::numeric(ParameterId::Priority, u64::from(self.priority)).into());
        parameters.push(Parameter::numeric(ParameterId::MaxEntitySize, u64::from(self.max_entity_size)).into());

        let format = if self.variable_format { 0x80 } else { 0x00 };
        parameters.push(
            ParameterGroup::new(
                ParameterGroupId::LogicalAttributes,
                vec![
                    Parameter::numeric(ParameterId::ArticleFormat, format),
                    Parameter::numeric(ParameterId::RecordLength, u64::from(self.record_length)),
                ],
            )
            .into(),
        );

        if let Some(size) = self.file_size_kb {
            parameters.push(
                ParameterGroup::new(
                    ParameterGroupId::PhysicalAttributes,
                    vec![
                        Parameter::numeric(ParameterId::ReservationUnit, 0),
                        Parameter::numeric(ParameterId::MaxReservation, u64::from(size)),
                    ],
                )
                .into(),
            );
        }
        parameters
    }
}

/// SELECT configuration (receive a file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectRequest {
    /// Virtual file name (PI 12).
    pub filename: String,
    /// Transfer identifier (PI 13); reuse it when restarting.
    pub transfer_id: u32,
    /// File type (PI 11).
    pub file_type: u16,
    /// Priority (PI 17).
    pub priority: u8,
    /// Resume an interrupted transfer (PI 15).
    pub restart: bool,
}

impl SelectRequest {
    /// Fresh transfer of `filename`.
    pub fn new(filename: impl Into<String>, transfer_id: u32) -> Self {
        Self {
            filename: filename.into(),
            transfer_id,
            file_type: 0,
            priority: 0,
            restart: false,
        }
    }
}

impl FpduRequest for SelectRequest {
    const KIND: FpduType = FpduType::Select;

    fn parameters(&self) -> Vec<ParameterValue> {
        let mut parameters = vec![
            file_id(self.file_type, &self.filename),
            Parameter::numeric(ParameterId::TransferId, u64::from(self.transfer_id)).into(),
            Parameter::numeric(ParameterId::RequestedAttributes, 0).into(),
        ];
        if self.restart {
            parameters.push(Parameter::numeric(ParameterId::RestartFlag, 1).into());
        }
        parameters.push(Parameter::numeric(ParameterId::Priority, u64::from(self.priority)).into());
        parameters
    }
}

/// READ configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadRequest {
    /// Sync number to resume from; 0 reads from the start.
    pub restart_point: u32,
}

impl FpduRequest for ReadRequest {
    const KIND: FpduType = FpduType::Read;

    fn parameters(&self) -> Vec<ParameterValue> {
        vec![Parameter::numeric(ParameterId::RestartPoint, u64::from(self.restart_point)).into()]
    }
}

fn file_id(file_type: u16, filename: &str) -> ParameterValue {
    ParameterGroup::new(
        ParameterGroupId::FileId,
        vec![
            Parameter::numeric(ParameterId::FileType, u64::from(file_type)),
            Parameter::string(ParameterId::Filename, filename),
        ],
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fpdu::{Fpdu, parse};

    fn codes(fpdu: &Fpdu) -> Vec<u8> {
        fpdu.parameters().iter().map(ParameterValue::code).collect()
    }

    #[test]
    fn test_connect_parameter_order() {
        let mut request = ConnectRequest::new("LOOP", "BANK");
        request.password = Some("SECRET".into());
        request.sync_points = Some(SyncPointsDescriptor::new(256, 4));
        request.access = AccessType::Read;
        request.resync = true;

        let fpdu = request.to_fpdu(0, 5);
        assert_eq!(codes(&fpdu), vec![3, 4, 5, 6, 7, 22, 23]);
        assert_eq!(fpdu.parameter(ParameterId::SyncPoints).unwrap().value, vec![0x01, 0x00, 4]);
        assert_eq!(fpdu.numeric(ParameterId::AccessType), Some(1));
        assert_eq!(fpdu.numeric(ParameterId::Version), Some(2));
    }

    #[test]
    fn test_minimal_connect_bytes() {
        let fpdu = ConnectRequest::new("A", "B").to_fpdu(0, 1);
        let bytes = fpdu.encode().unwrap();
        assert_eq!(bytes, hex::decode("001240200001030141040142060102160100").unwrap());
        assert_eq!(parse(&bytes).unwrap(), fpdu);
    }

    #[test]
    fn test_create_parameters() {
        let mut request = CreateRequest::new("OUT.DAT", 77);
        request.restart = true;
        request.file_size_kb = Some(2048);

        let fpdu = request.to_fpdu(9, 5);
        assert_eq!(codes(&fpdu), vec![9, 13, 14, 15, 17, 25, 30, 40]);
        assert_eq!(fpdu.parameter(ParameterId::Filename).unwrap().as_str(), Some("OUT.DAT"));
        assert_eq!(fpdu.numeric(ParameterId::TransferId), Some(77));
        assert_eq!(fpdu.numeric(ParameterId::RestartFlag), Some(1));
        assert_eq!(fpdu.numeric(ParameterId::RecordLength), Some(1024));
        assert_eq!(fpdu.numeric(ParameterId::MaxReservation), Some(2048));
        assert_eq!(parse(&fpdu.encode().unwrap()).unwrap(), fpdu);
    }

    #[test]
    fn test_select_without_restart() {
        let fpdu = SelectRequest::new("IN.DAT", 3).to_fpdu(9, 5);
        assert_eq!(codes(&fpdu), vec![9, 13, 14, 17]);
        assert!(fpdu.parameter(ParameterId::RestartFlag).is_none());
    }

    #[test]
    fn test_read_restart_point() {
        let fpdu = ReadRequest { restart_point: 2 }.to_fpdu(9, 5);
        assert_eq!(fpdu.parameter(ParameterId::RestartPoint).unwrap().value, vec![0, 0, 2]);
    }
}
