//! Interrupted transfer resumed on a new connection.
//!
//! A scripted responder keeps what it received across connections and
//! answers ACK_WRITE with its last sync point when CREATE asks to restart.

#![cfg(feature = "session")]

use std::time::Duration;

use pesit_protocol::prelude::*;
use tokio::io::{DuplexStream, duplex};

const RESPONDER_ID: u8 = 7;
const TRANSFER_ID: u32 = 42;

/// Responder-side file state, kept across connections.
#[derive(Debug, Default)]
struct Store {
    transfer_id: Option<u32>,
    restart_requested: bool,
    last_sync: u32,
    syncs: Vec<u32>,
    received: Vec<u8>,
    completed: bool,
}

async fn reply(reader: &mut FpduReader<DuplexStream>, fpdu: Fpdu) {
    write_entity(reader.get_mut(), &fpdu.encode().unwrap()).await.unwrap();
}

/// Serve one connection until RELEASE or until the initiator goes away.
async fn respond(stream: DuplexStream, store: &mut Store) {
    let mut reader = FpduReader::new(stream);
    let mut client = 0;
    let ok = DiagnosticCode::SUCCESS;

    while let Ok(fpdu) = reader.read().await {
        let answer = match fpdu.kind {
            FpduType::Connect => {
                client = fpdu.id_src;
                assert_eq!(fpdu.id_dst, 0);
                Some(
                    Fpdu::new(FpduType::Aconnect, client, RESPONDER_ID)
                        .push(Parameter::numeric(ParameterId::Version, 2))
                        .push(SyncPointsDescriptor::new(1, 1).to_parameter()),
                )
            }
            FpduType::Create => {
                let transfer_id = fpdu.numeric(ParameterId::TransferId).map(|id| id as u32);
                store.restart_requested = fpdu.numeric(ParameterId::RestartFlag) == Some(1);
                if store.restart_requested {
                    assert_eq!(transfer_id, store.transfer_id);
                }
                store.transfer_id = transfer_id;
                Some(Fpdu::with_diagnostic(FpduType::AckCreate, client, RESPONDER_ID, ok))
            }
            FpduType::Open => Some(Fpdu::with_diagnostic(FpduType::AckOpen, client, RESPONDER_ID, ok)),
            FpduType::Write => {
                let point = if store.restart_requested { store.last_sync } else { 0 };
                store.received.truncate(point as usize * 1024);
                Some(
                    Fpdu::with_diagnostic(FpduType::AckWrite, client, RESPONDER_ID, ok)
                        .push(Parameter::numeric(ParameterId::RestartPoint, u64::from(point))),
                )
            }
            FpduType::Dtf => {
                store.received.extend_from_slice(fpdu.data().unwrap());
                None
            }
            FpduType::Syn => {
                let sync = fpdu.numeric(ParameterId::SyncNumber).unwrap() as u32;
                store.syncs.push(sync);
                store.last_sync = sync;
                Some(
                    Fpdu::new(FpduType::AckSyn, client, RESPONDER_ID)
                        .push(Parameter::numeric(ParameterId::SyncNumber, u64::from(sync))),
                )
            }
            FpduType::DtfEnd => None,
            FpduType::Idt => Some(Fpdu::new(FpduType::AckIdt, client, RESPONDER_ID)),
            FpduType::TransEnd => {
                store.completed = true;
                Some(Fpdu::with_diagnostic(FpduType::AckTransEnd, client, RESPONDER_ID, ok))
            }
            FpduType::Close => Some(Fpdu::with_diagnostic(FpduType::AckClose, client, RESPONDER_ID, ok)),
            FpduType::Deselect => {
                Some(Fpdu::with_diagnostic(FpduType::AckDeselect, client, RESPONDER_ID, ok))
            }
            FpduType::Release => {
                reply(&mut reader, Fpdu::new(FpduType::Relconf, client, RESPONDER_ID)).await;
                return;
            }
            other => panic!("responder did not expect {other}"),
        };
        if let Some(answer) = answer {
            reply(&mut reader, answer).await;
        }
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        local_id: Some(3),
        receive_timeout: Duration::from_secs(5),
        ..SessionConfig::default()
    }
}

fn connect_request() -> ConnectRequest {
    ConnectRequest {
        sync_points: Some(SyncPointsDescriptor::new(1, 1)),
        ..ConnectRequest::new("CLIENT", "BANK")
    }
}

fn file() -> Vec<u8> {
    (0..5000u32).map(|i| (i % 251) as u8).collect()
}

/// First attempt: 3000 bytes with sync points 1 and 2, then IDT.
async fn interrupted_attempt(file: &[u8], store: &mut Store) {
    let (ours, theirs) = duplex(1 << 16);
    let initiator = async {
        let mut session = Session::new(ours, config());
        session.connect(&connect_request()).await.unwrap();
        session.create(&CreateRequest::new("PAYMENTS", TRANSFER_ID)).await.unwrap();
        session.open().await.unwrap();
        assert_eq!(session.write().await.unwrap(), 0);
        session.send_data(&file[..3000]).await.unwrap();
        session.interrupt(DiagnosticCode::INTERRUPTED_BY_SENDER).await.unwrap();
        session.last_sync()
    };
    let (last_sync, ()) = tokio::join!(initiator, respond(theirs, store));

    assert_eq!(last_sync, 2);
    assert_eq!(store.syncs, vec![1, 2]);
    assert_eq!(store.received.len(), 3000);
    assert!(!store.completed);
}

/// Second attempt: restart the same transfer and send the rest.
///
/// Returns the restart point, the resume offset and the final phase.
async fn resumed_attempt(file: &[u8], store: &mut Store) -> (RestartPoint, usize, SessionPhase) {
    let (ours, theirs) = duplex(1 << 16);
    let initiator = async {
        let mut session = Session::new(ours, config());
        session.connect(&connect_request()).await.unwrap();
        let create = CreateRequest {
            restart: true,
            ..CreateRequest::new("PAYMENTS", TRANSFER_ID)
        };
        session.create(&create).await.unwrap();
        session.open().await.unwrap();

        let point = session.write().await.unwrap();
        let restart = session.restart().unwrap();
        assert_eq!(restart.sync, point);
        assert_eq!(restart.transfer_id, TRANSFER_ID);

        let offset = session.resume_offset() as usize;
        session.send_data(&file[offset..]).await.unwrap();
        session.end_data(DiagnosticCode::SUCCESS).await.unwrap();
        session.end_transfer().await.unwrap();
        session.close(DiagnosticCode::SUCCESS).await.unwrap();
        session.deselect(DiagnosticCode::SUCCESS).await.unwrap();
        session.release(DiagnosticCode::SUCCESS).await.unwrap();
        (restart, offset, session.phase())
    };
    let (result, ()) = tokio::join!(initiator, respond(theirs, store));
    result
}

#[tokio::test]
async fn test_interrupted_write_resumes_after_last_sync_point() {
    let file = file();
    let mut store = Store::default();
    interrupted_attempt(&file, &mut store).await;

    let (restart, offset, phase) = resumed_attempt(&file, &mut store).await;

    assert_eq!(restart.sync, 2);
    assert_eq!(offset, 2 * 1024);
    assert_eq!(phase, SessionPhase::Released);
    // Numbering continues after the restart point.
    assert_eq!(store.syncs, vec![1, 2, 3, 4]);
    assert!(store.completed);
    assert_eq!(store.received, file);
}

#[tokio::test]
async fn test_resume_from_responder_point_below_last_sent() {
    let file = file();
    let mut store = Store::default();
    interrupted_attempt(&file, &mut store).await;

    // Sync point 2 was sent and acknowledged but never reached the disk.
    store.last_sync = 1;
    let (restart, offset, phase) = resumed_attempt(&file, &mut store).await;

    assert_eq!(restart.sync, 1);
    assert_eq!(restart.next_sync(), 2);
    assert_eq!(offset, 1024);
    assert_eq!(phase, SessionPhase::Released);
    // Bytes 1024..3000 are sent again and numbering restarts at 2.
    assert_eq!(store.syncs, vec![1, 2, 2, 3, 4]);
    assert!(store.completed);
    assert_eq!(store.received, file);
}

#[tokio::test]
async fn test_fresh_transfer_starts_at_zero() {
    let mut store = Store::default();
    let (ours, theirs) = duplex(1 << 16);

    let initiator = async {
        let mut session = Session::new(ours, config());
        session.connect(&connect_request()).await.unwrap();
        // No previous transfer: the responder restarts from 0.
        session.create(&CreateRequest::new("PAYMENTS", TRANSFER_ID)).await.unwrap();
        session.open().await.unwrap();
        let point = session.write().await.unwrap();
        session.send_data(b"single chunk").await.unwrap();
        session.end_data(DiagnosticCode::SUCCESS).await.unwrap();
        session.end_transfer().await.unwrap();
        session.release(DiagnosticCode::SUCCESS).await.unwrap();
        (point, session.resume_offset())
    };
    let ((point, offset), ()) = tokio::join!(initiator, respond(theirs, &mut store));

    assert_eq!((point, offset), (0, 0));
    assert!(store.syncs.is_empty());
    assert_eq!(store.received, b"single chunk");
}
