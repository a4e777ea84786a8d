//! FPDU encoding and decoding.
//!
//! Wire format:
//! ```text
//! +------------+-------+------+-------+-------+------------------------+
//! | length (2) | phase | type | idDst | idSrc | parameters | raw data  |
//! +------------+-------+------+-------+-------+------------------------+
//! ```
//!
//! `length` is big-endian and counts the whole FPDU, itself included.
//! DTF-family FPDUs carry raw data; every other kind carries parameters.

use tracing::debug;

use super::diagnostic::DiagnosticCode;
use super::kind::FpduType;
use super::param::{Parameter, ParameterId, ParameterValue};
use crate::core::{BuildError, FPDU_HEADER_SIZE, MAX_SYNC_WINDOW, ParseError};

/// FPDU payload: parameters or raw data, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Ordered parameters (all non-DTF kinds).
    Parameters(Vec<ParameterValue>),
    /// Raw bytes (DTF family).
    Data(Vec<u8>),
}

/// A decoded or to-be-encoded FPDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fpdu {
    /// FPDU kind.
    pub kind: FpduType,
    /// Destination connection id.
    pub id_dst: u8,
    /// Source connection id (article count on multi-article DTFs).
    pub id_src: u8,
    /// Payload.
    pub payload: Payload,
}

impl Fpdu {
    /// Create an FPDU with an empty payload of the right family.
    pub fn new(kind: FpduType, id_dst: u8, id_src: u8) -> Self {
        let payload = if kind.is_data() {
            Payload::Data(Vec::new())
        } else {
            Payload::Parameters(Vec::new())
        };
        Self { kind, id_dst, id_src, payload }
    }

    /// Create an FPDU carrying parameters.
    pub fn with_parameters(
        kind: FpduType,
        id_dst: u8,
        id_src: u8,
        parameters: Vec<ParameterValue>,
    ) -> Self {
        Self { kind, id_dst, id_src, payload: Payload::Parameters(parameters) }
    }

    /// Create an FPDU carrying raw data.
    pub fn with_data(kind: FpduType, id_dst: u8, id_src: u8, data: Vec<u8>) -> Self {
        Self { kind, id_dst, id_src, payload: Payload::Data(data) }
    }

    /// Create an FPDU whose only parameter is a diagnostic.
    pub fn with_diagnostic(kind: FpduType, id_dst: u8, id_src: u8, diagnostic: DiagnosticCode) -> Self {
        Self::new(kind, id_dst, id_src).push(Parameter::bytes(
            ParameterId::Diagnostic,
            diagnostic.to_bytes().to_vec(),
        ))
    }

    /// Append a parameter or group. No effect on DTF-family FPDUs.
    pub fn push(mut self, parameter: impl Into<ParameterValue>) -> Self {
        if let Payload::Parameters(parameters) = &mut self.payload {
            parameters.push(parameter.into());
        }
        self
    }

    /// Parameters in wire order (empty for data FPDUs).
    pub fn parameters(&self) -> &[ParameterValue] {
        match &self.payload {
            Payload::Parameters(parameters) => parameters,
            Payload::Data(_) => &[],
        }
    }

    /// Raw data, for DTF-family FPDUs.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Data(data) => Some(data),
            Payload::Parameters(_) => None,
        }
    }

    /// Find a parameter by id, searching inside groups too.
    pub fn parameter(&self, id: ParameterId) -> Option<&Parameter> {
        self.parameters().iter().find_map(|value| value.find(id))
    }

    /// Numeric value of a parameter.
    pub fn numeric(&self, id: ParameterId) -> Option<u64> {
        self.parameter(id).and_then(Parameter::as_u64)
    }

    /// Diagnostic carried in PI 2, if present and well-formed.
    pub fn diagnostic(&self) -> Option<DiagnosticCode> {
        self.parameter(ParameterId::Diagnostic)
            .and_then(|p| DiagnosticCode::from_bytes(&p.value))
    }

    /// Check if this FPDU carries no diagnostic or a success diagnostic.
    pub fn is_positive(&self) -> bool {
        self.diagnostic().is_none_or(DiagnosticCode::is_success)
    }

    /// Encode this FPDU.
    pub fn encode(&self) -> Result<Vec<u8>, BuildError> {
        match &self.payload {
            Payload::Parameters(parameters) => build(self.kind, self.id_dst, self.id_src, parameters),
            Payload::Data(data) => build_data(self.kind, self.id_dst, self.id_src, data),
        }
    }
}

/// Build a parameter-carrying FPDU.
///
/// Parameters are emitted in the order given. Fails if a mandatory
/// parameter for `kind` is missing or `kind` is a DTF-family type.
pub fn build(
    kind: FpduType,
    id_dst: u8,
    id_src: u8,
    parameters: &[ParameterValue],
) -> Result<Vec<u8>, BuildError> {
    if kind.is_data() {
        return Err(BuildError::PayloadMismatch { kind });
    }

    for &id in kind.mandatory_parameters() {
        if !parameters.iter().any(|p| p.find(id).is_some()) {
            return Err(BuildError::MissingMandatoryParameter { kind, id: id as u8 });
        }
    }

    for parameter in parameters {
        match parameter {
            ParameterValue::Single(p) => check_value(p)?,
            ParameterValue::Group(group) => group.members.iter().try_for_each(check_value)?,
        }
    }

    let length = FPDU_HEADER_SIZE + parameters.iter().map(ParameterValue::encoded_len).sum::<usize>();
    let mut buf = header(kind, id_dst, id_src, length)?;
    for parameter in parameters {
        parameter.encode_into(&mut buf);
    }

    debug!(fpdu = kind.name(), id_dst, id_src, length, "built FPDU");
    Ok(buf)
}

/// Reject values the peer cannot read back: numerics wider than their
/// fixed field and sync windows above 16.
fn check_value(parameter: &Parameter) -> Result<(), BuildError> {
    let id = parameter.id;
    if let Some(width) = id.numeric_width() {
        if parameter.value.len() > width {
            return Err(BuildError::InvalidValue {
                id: id as u8,
                reason: format!("{} bytes exceed the {width}-byte numeric field", parameter.value.len()),
            });
        }
    }
    if id == ParameterId::SyncPoints && parameter.value.get(2).is_some_and(|&w| w > MAX_SYNC_WINDOW) {
        return Err(BuildError::InvalidValue {
            id: id as u8,
            reason: format!("sync window above {MAX_SYNC_WINDOW}"),
        });
    }
    Ok(())
}

/// Build a DTF-family FPDU carrying `data` verbatim.
pub fn build_data(kind: FpduType, id_dst: u8, id_src: u8, data: &[u8]) -> Result<Vec<u8>, BuildError> {
    if !kind.is_data() {
        return Err(BuildError::PayloadMismatch { kind });
    }

    let mut buf = header(kind, id_dst, id_src, FPDU_HEADER_SIZE + data.len())?;
    buf.extend_from_slice(data);
    Ok(buf)
}

/// Pack several articles into one DTF-family FPDU.
///
/// Each article is prefixed with its 2-byte length and `idSrc` carries the
/// article count. Returns `None` when the result would exceed
/// `max_entity_size`, when there are more than 255 articles, or when
/// `kind` is not a data kind; the caller must split differently.
pub fn build_multi_article<A: AsRef<[u8]>>(
    kind: FpduType,
    id_dst: u8,
    articles: &[A],
    max_entity_size: usize,
) -> Option<Vec<u8>> {
    if !kind.is_data() {
        return None;
    }
    let count = u8::try_from(articles.len()).ok()?;

    let length = FPDU_HEADER_SIZE + articles.iter().map(|a| 2 + a.as_ref().len()).sum::<usize>();
    if length > max_entity_size {
        return None;
    }

    let mut buf = header(kind, id_dst, count, length).ok()?;
    for article in articles {
        let article = article.as_ref();
        buf.extend_from_slice(&u16::try_from(article.len()).ok()?.to_be_bytes());
        buf.extend_from_slice(article);
    }
    Some(buf)
}

/// How many fixed-size articles fit in one entity (at least 1).
pub fn articles_per_entity(article_size: usize, max_entity_size: usize) -> usize {
    let room = max_entity_size.saturating_sub(FPDU_HEADER_SIZE);
    (room / (2 + article_size)).max(1)
}

/// Split the data of a multi-article DTF back into its articles.
pub fn split_articles(data: &[u8], count: u8) -> Result<Vec<&[u8]>, ParseError> {
    let mut articles = Vec::with_capacity(usize::from(count));
    let mut rest = data;
    for _ in 0..count {
        let [hi, lo, tail @ ..] = rest else {
            return Err(ParseError::FrameTooShort { actual: rest.len() });
        };
        let length = usize::from(u16::from_be_bytes([*hi, *lo]));
        if length > tail.len() {
            return Err(ParseError::LengthMismatch { declared: length, available: tail.len() });
        }
        articles.push(&tail[..length]);
        rest = &tail[length..];
    }
    Ok(articles)
}

/// Read the length prefix at the start of `buf`.
pub fn peek_length(buf: &[u8]) -> Option<usize> {
    match buf {
        [hi, lo, ..] => Some(usize::from(u16::from_be_bytes([*hi, *lo]))),
        _ => None,
    }
}

/// Parse one FPDU from the start of `buf`.
///
/// Only the declared length is read; trailing bytes (typically the next
/// FPDU) are left untouched.
pub fn parse(buf: &[u8]) -> Result<Fpdu, ParseError> {
    if buf.len() < FPDU_HEADER_SIZE {
        return Err(ParseError::FrameTooShort { actual: buf.len() });
    }
    let declared = peek_length(buf).unwrap_or_default();
    if declared < FPDU_HEADER_SIZE {
        return Err(ParseError::FrameTooShort { actual: declared });
    }
    if declared > buf.len() {
        return Err(ParseError::LengthMismatch { declared, available: buf.len() });
    }

    let frame = &buf[..declared];
    let (phase, code, id_dst, id_src) = (frame[2], frame[3], frame[4], frame[5]);
    let kind = FpduType::from_codes(phase, code).ok_or(ParseError::UnknownFpduType { phase, code })?;
    let body = &frame[FPDU_HEADER_SIZE..];

    let fpdu = if kind.is_data() {
        Fpdu::with_data(kind, id_dst, id_src, body.to_vec())
    } else {
        let context = format!("FPDU {}", kind.name());
        let mut parameters = Vec::new();
        let mut offset = 0;
        while offset < body.len() {
            let (value, consumed) = ParameterValue::decode(&body[offset..], &context)?;
            parameters.push(value);
            offset += consumed;
        }
        Fpdu::with_parameters(kind, id_dst, id_src, parameters)
    };

    debug!(fpdu = kind.name(), id_dst, id_src, length = declared, "parsed FPDU");
    Ok(fpdu)
}

fn header(kind: FpduType, id_dst: u8, id_src: u8, length: usize) -> Result<Vec<u8>, BuildError> {
    let wire_length = u16::try_from(length).map_err(|_| BuildError::TooLarge { length })?;

    let mut buf = Vec::with_capacity(length);
    buf.extend_from_slice(&wire_length.to_be_bytes());
    buf.extend_from_slice(&[kind.phase(), kind.code(), id_dst, id_src]);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FpduRequest;
    use crate::fpdu::{CreateRequest, ParameterGroup, ParameterGroupId};
    use crate::core::{MAX_FPDU_SIZE, ParameterError};

    #[test]
    fn test_literal_aconnect_decode() {
        let bytes = hex::decode("000b402101016303010203").unwrap();
        let fpdu = parse(&bytes).unwrap();

        assert_eq!(fpdu.kind, FpduType::Aconnect);
        assert_eq!(fpdu.id_dst, 1);
        assert_eq!(fpdu.id_src, 1);
        assert_eq!(fpdu.parameters().len(), 1);
        assert_eq!(fpdu.parameter(ParameterId::FreeMessage).unwrap().value, vec![1, 2, 3]);
    }

    #[test]
    fn test_literal_empty_dtf_encode() {
        let bytes = build_data(FpduType::Dtf, 1, 0, &[]).unwrap();
        assert_eq!(bytes, vec![0x00, 0x06, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_dtf_decode_keeps_raw_data() {
        let fpdu = parse(&hex::decode("000a0000010241424344").unwrap()).unwrap();
        assert_eq!(fpdu.kind, FpduType::Dtf);
        assert_eq!(fpdu.data(), Some(&b"ABCD"[..]));
        assert!(fpdu.parameters().is_empty());
    }

    #[test]
    fn test_article_segments() {
        for (code, kind) in [(0x41, FpduType::Dtfda), (0x40, FpduType::Dtfma), (0x42, FpduType::Dtffa)] {
            let bytes = [0x00, 0x08, 0x00, code, 0x01, 0x02, 0xAA, 0xBB];
            let fpdu = parse(&bytes).unwrap();
            assert_eq!(fpdu.kind, kind);
            assert_eq!(fpdu.data(), Some(&[0xAA, 0xBB][..]));
        }
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let bytes = [hex::decode("000800000102aabb").unwrap(), hex::decode("000bc00401000203000000").unwrap()].concat();
        let fpdu = parse(&bytes).unwrap();
        assert_eq!(fpdu.kind, FpduType::Dtf);
        assert_eq!(fpdu.data(), Some(&[0xAA, 0xBB][..]));
    }

    #[test]
    fn test_zero_length_parameter() {
        let fpdu = parse(&hex::decode("0008402101016300").unwrap()).unwrap();
        assert_eq!(fpdu.parameter(ParameterId::FreeMessage).unwrap().value, Vec::<u8>::new());
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let err = parse(&hex::decode("000940210101fa0100").unwrap()).unwrap_err();
        assert_eq!(
            err,
            ParseError::Parameter(ParameterError::UnknownParameter {
                id: 250,
                length: 1,
                context: "FPDU ACONNECT".to_string(),
            })
        );
    }

    #[test]
    fn test_malformed_lengths() {
        assert_eq!(parse(&[0, 6, 0x40]), Err(ParseError::FrameTooShort { actual: 3 }));
        assert_eq!(
            parse(&[0, 4, 0x40, 0x21, 1, 1]),
            Err(ParseError::FrameTooShort { actual: 4 })
        );
        assert_eq!(
            parse(&[0, 10, 0x40, 0x21, 1, 1]),
            Err(ParseError::LengthMismatch { declared: 10, available: 6 })
        );
        assert_eq!(
            parse(&[0, 6, 0x40, 0x77, 1, 1]),
            Err(ParseError::UnknownFpduType { phase: 0x40, code: 0x77 })
        );
    }

    #[test]
    fn test_roundtrip_every_kind() {
        for descriptor in crate::fpdu::CATALOG.iter() {
            let kind = descriptor.kind;
            let fpdu = if kind.is_data() {
                Fpdu::with_data(kind, 1, 2, vec![0xDE, 0xAD])
            } else {
                descriptor.mandatory.iter().fold(Fpdu::new(kind, 1, 2), |fpdu, &id| {
                    let parameter = match id {
                        ParameterId::Diagnostic => {
                            Parameter::bytes(id, DiagnosticCode::SUCCESS.to_bytes().to_vec())
                        }
                        _ if id.numeric_width().is_some() => Parameter::numeric(id, 1),
                        _ => Parameter::string(id, "X"),
                    };
                    fpdu.push(parameter)
                })
            };

            let bytes = fpdu.encode().unwrap();
            assert_eq!(parse(&bytes).unwrap(), fpdu, "{kind}");
        }
    }

    #[test]
    fn test_roundtrip_with_group() {
        let fpdu = Fpdu::new(FpduType::Select, 3, 7)
            .push(ParameterGroup::new(
                ParameterGroupId::FileId,
                vec![
                    Parameter::numeric(ParameterId::FileType, 0),
                    Parameter::string(ParameterId::Filename, "PAYMENTS.DAT"),
                ],
            ))
            .push(Parameter::numeric(ParameterId::TransferId, 42));

        let bytes = fpdu.encode().unwrap();
        assert_eq!(peek_length(&bytes), Some(bytes.len()));
        assert_eq!(parse(&bytes).unwrap(), fpdu);
    }

    #[test]
    fn test_mandatory_parameter_check() {
        let err = build(FpduType::Abort, 1, 1, &[]).unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingMandatoryParameter { kind: FpduType::Abort, id: 2 }
        );

        // Filename satisfies CREATE even when nested in PGI 9.
        let err = Fpdu::new(FpduType::Create, 1, 1)
            .push(ParameterGroup::new(
                ParameterGroupId::FileId,
                vec![Parameter::string(ParameterId::Filename, "F")],
            ))
            .encode()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingMandatoryParameter { kind: FpduType::Create, id: 13 }
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let create = CreateRequest::new("F", 0x0100_0000).to_fpdu(1, 2);
        assert!(matches!(
            create.encode(),
            Err(BuildError::InvalidValue { id: 13, .. })
        ));

        let connect = Fpdu::new(FpduType::Connect, 0, 1)
            .push(Parameter::string(ParameterId::Requester, "A"))
            .push(Parameter::string(ParameterId::Server, "B"))
            .push(Parameter::numeric(ParameterId::Version, 2))
            .push(Parameter::bytes(ParameterId::SyncPoints, vec![0, 1, 17]))
            .push(Parameter::numeric(ParameterId::AccessType, 0));
        assert!(matches!(connect.encode(), Err(BuildError::InvalidValue { id: 7, .. })));
    }

    #[test]
    fn test_payload_family_mismatch() {
        assert_eq!(
            build(FpduType::Dtf, 1, 1, &[]),
            Err(BuildError::PayloadMismatch { kind: FpduType::Dtf })
        );
        assert_eq!(
            build_data(FpduType::Connect, 1, 1, b"x"),
            Err(BuildError::PayloadMismatch { kind: FpduType::Connect })
        );
    }

    #[test]
    fn test_too_large() {
        let data = vec![0u8; MAX_FPDU_SIZE];
        assert_eq!(
            build_data(FpduType::Dtf, 1, 1, &data),
            Err(BuildError::TooLarge { length: MAX_FPDU_SIZE + 6 })
        );
    }

    #[test]
    fn test_multi_article() {
        let articles: [&[u8]; 3] = [b"abc", b"de", b"f"];
        let bytes = build_multi_article(FpduType::Dtf, 1, &articles, 100).unwrap();

        assert_eq!(bytes.len(), 18);
        assert_eq!(bytes[5], 3);
        let fpdu = parse(&bytes).unwrap();
        let split = split_articles(fpdu.data().unwrap(), fpdu.id_src).unwrap();
        assert_eq!(split, articles.to_vec());
    }

    #[test]
    fn test_multi_article_exceeding_bound() {
        let articles = vec![vec![0u8; 500], vec![0u8; 500]];
        assert!(build_multi_article(FpduType::Dtf, 1, &articles, 100).is_none());
        assert!(build_multi_article(FpduType::Dtf, 1, &articles, 1010).is_some());
        assert!(build_multi_article(FpduType::Dtf, 1, &articles, 1009).is_none());
    }

    #[test]
    fn test_articles_per_entity() {
        assert_eq!(articles_per_entity(10, 100), 7);
        assert_eq!(articles_per_entity(1000, 50), 1);
    }

    #[test]
    fn test_split_articles_truncated() {
        assert_eq!(
            split_articles(&[0, 5, 1, 2], 1),
            Err(ParseError::LengthMismatch { declared: 5, available: 2 })
        );
        assert_eq!(split_articles(&[0], 1), Err(ParseError::FrameTooShort { actual: 1 }));
    }

    #[test]
    fn test_diagnostic_accessors() {
        let ack = Fpdu::with_diagnostic(FpduType::AckSelect, 1, 2, DiagnosticCode::FILE_NOT_FOUND);
        assert_eq!(ack.diagnostic(), Some(DiagnosticCode::FILE_NOT_FOUND));
        assert!(!ack.is_positive());
        assert!(Fpdu::new(FpduType::Aconnect, 1, 2).is_positive());
    }
}
