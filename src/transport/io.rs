//! Transport entity framing.
//!
//! On a byte stream every entity is preceded by its own 2-byte big-endian
//! length:
//!
//! ```text
//! +----------------+----------------------------------+
//! | entity len (2) | FPDU | FPDU | ...                 |
//! +----------------+----------------------------------+
//! ```
//!
//! The legacy pre-connection message and its `ACK0` are framed the same way.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::core::PesitResult;
use crate::fpdu::Fpdu;

/// Read one length-prefixed entity.
///
/// A stream closed before or inside an entity yields
/// [`io::ErrorKind::UnexpectedEof`].
pub async fn read_entity<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let length = usize::from(reader.read_u16().await?);
    let mut entity = vec![0u8; length];
    reader.read_exact(&mut entity).await?;
    trace!(length, "read entity");
    Ok(entity)
}

/// Write one length-prefixed entity and flush.
pub async fn write_entity<W>(writer: &mut W, entity: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let length = u16::try_from(entity.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("entity of {} bytes exceeds the 16-bit length prefix", entity.len()),
        )
    })?;
    let mut framed = Vec::with_capacity(entity.len() + 2);
    framed.extend_from_slice(&length.to_be_bytes());
    framed.extend_from_slice(entity);
    writer.write_all(&framed).await?;
    writer.flush().await?;
    trace!(length, "wrote entity");
    Ok(())
}

/// Encode several FPDUs into a single entity and write it.
pub async fn write_fpdus<W>(writer: &mut W, fpdus: &[Fpdu]) -> PesitResult<Vec<u8>>
where
    W: AsyncWrite + Unpin,
{
    let mut entity = Vec::new();
    for fpdu in fpdus {
        entity.extend(fpdu.encode()?);
    }
    write_entity(writer, &entity).await?;
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fpdu::{DiagnosticCode, FpduType};

    #[tokio::test]
    async fn test_entity_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        write_entity(&mut a, b"hello").await.unwrap();
        write_entity(&mut a, &[]).await.unwrap();

        assert_eq!(read_entity(&mut b).await.unwrap(), b"hello");
        assert_eq!(read_entity(&mut b).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn test_length_prefix_on_wire() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        write_entity(&mut a, &[0xAA, 0xBB, 0xCC]).await.unwrap();

        let mut raw = [0u8; 5];
        b.read_exact(&mut raw).await.unwrap();
        assert_eq!(raw, [0x00, 0x03, 0xAA, 0xBB, 0xCC]);
    }

    #[tokio::test]
    async fn test_truncated_entity() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        a.write_all(&[0x00, 0x10, 0x01]).await.unwrap();
        drop(a);

        let err = read_entity(&mut b).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_oversized_entity_rejected() {
        let (mut a, _b) = tokio::io::duplex(16);
        let err = write_entity(&mut a, &vec![0u8; 70_000]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_write_fpdus_concatenates() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let fpdus = [
            Fpdu::with_data(FpduType::Dtf, 1, 2, vec![0xAA, 0xBB]),
            Fpdu::with_diagnostic(FpduType::DtfEnd, 1, 2, DiagnosticCode::SUCCESS),
        ];
        write_fpdus(&mut a, &fpdus).await.unwrap();

        let entity = read_entity(&mut b).await.unwrap();
        assert_eq!(entity, hex::decode("000800000102aabb000bc00401020203000000").unwrap());
    }
}
