//! The session engine.
//!
//! A [`Session`] drives one connection from the initiator side: one
//! outstanding request at a time, each answered by exactly one
//! acknowledgement, in order. Data transfer applies the sync-point rule
//! on the way out and acknowledges sync points on the way in.

use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::recorder::{Direction, TrafficRecorder};
use super::state::{SessionPhase, SessionState};
use crate::core::{
    BuildError, FPDU_HEADER_SIZE, FpduRequest, PesitError, PesitResult, UNASSIGNED_CONNECTION_ID,
};
use crate::fpdu::{
    ConnectRequest, CreateRequest, DiagnosticCode, Fpdu, FpduType, Parameter, ParameterId,
    ReadRequest, SelectRequest, build_multi_article,
};
use crate::legacy::{PreConnection, is_ack0};
use crate::sync::{
    NegotiatedSync, RestartPoint, SyncPointReceiver, SyncPointTracker, SyncPointsDescriptor,
    SyncReceipt, restart_point,
};
use crate::transport::{FpduReader, write_entity};

/// What [`Session::next_data`] received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEvent {
    /// A DTF-family FPDU. Multi-article FPDUs carry the article count in
    /// `id_src`; see [`split_articles`](crate::fpdu::split_articles).
    Data(Fpdu),
    /// A sync point, already acknowledged when the window requires it.
    SyncPoint(u32),
    /// DTF_END and its diagnostic.
    End(DiagnosticCode),
}

/// One PeSIT connection, initiator side.
#[derive(Debug)]
pub struct Session<T> {
    reader: FpduReader<ReadHalf<T>>,
    writer: WriteHalf<T>,
    config: SessionConfig,
    state: SessionState,
    sender: SyncPointTracker,
    receiver: SyncPointReceiver,
    recorder: Option<TrafficRecorder>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Session<T> {
    /// Create a session over a connected byte stream.
    pub fn new(io: T, config: SessionConfig) -> Self {
        let (read_half, write_half) = tokio::io::split(io);
        let recorder = config.record_traffic.then(TrafficRecorder::new);
        Self {
            reader: FpduReader::new(read_half),
            writer: write_half,
            config,
            state: SessionState::default(),
            sender: SyncPointTracker::new(NegotiatedSync::DISABLED),
            receiver: SyncPointReceiver::new(NegotiatedSync::DISABLED),
            recorder,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    /// Sync parameters in force after [`connect`](Self::connect).
    pub fn negotiated_sync(&self) -> NegotiatedSync {
        self.state.sync
    }

    /// Restart point returned by the last WRITE or READ acknowledgement.
    pub fn restart_point(&self) -> Option<u32> {
        self.state.restart_point
    }

    /// Last sync number sent or received in the current transfer.
    pub fn last_sync(&self) -> u32 {
        self.sender.last_sync().max(self.receiver.last_sync())
    }

    /// Approximate byte offset to resume from, derived from the restart point.
    pub fn resume_offset(&self) -> u64 {
        crate::sync::resume_offset(
            self.state.restart_point.unwrap_or(0),
            self.state.sync.interval_bytes,
        )
    }

    /// Resume position of the current transfer, once WRITE or READ has
    /// been acknowledged.
    pub fn restart(&self) -> Option<RestartPoint> {
        let transfer_id = self.state.transfer_id?;
        let sync = self.state.restart_point?;
        Some(RestartPoint::new(transfer_id, sync, self.state.sync.interval_bytes))
    }

    /// Sender-side sync state.
    pub fn sync_tracker(&self) -> &SyncPointTracker {
        &self.sender
    }

    /// Recorded traffic, when enabled in the configuration.
    pub fn recorder(&self) -> Option<&TrafficRecorder> {
        self.recorder.as_ref()
    }

    /// Close the session and return the underlying stream.
    pub fn into_inner(self) -> T {
        self.reader.into_inner().unsplit(self.writer)
    }

    // -------------------------------------------------------------------------
    // Request/response primitives
    // -------------------------------------------------------------------------

    /// Send an FPDU that is not acknowledged (DTF, DTF_END, ABORT, ...).
    pub async fn send(&mut self, fpdu: &Fpdu) -> PesitResult<()> {
        let bytes = fpdu.encode()?;
        self.send_encoded(fpdu.kind, &bytes).await
    }

    /// Send `request` and wait for its acknowledgement.
    ///
    /// FPDUs other than the expected acknowledgement are skipped, except
    /// ABORT which fails with [`PesitError::ProtocolAbort`]. Negative
    /// acknowledgements are returned as is; check
    /// [`Fpdu::is_positive`]. On timeout the connection state is unknown
    /// and the caller should drop it.
    pub async fn send_and_await_ack(&mut self, request: &Fpdu) -> PesitResult<Fpdu> {
        let expected = request.kind.expected_responses();
        let Some(awaiting) = expected.first() else {
            return Err(PesitError::NoAcknowledgement { kind: request.kind });
        };
        self.send(request).await?;
        self.await_response(expected, awaiting.name()).await
    }

    async fn send_encoded(&mut self, kind: FpduType, bytes: &[u8]) -> PesitResult<()> {
        write_entity(&mut self.writer, bytes).await?;
        if let Some(recorder) = &mut self.recorder {
            recorder.record(Direction::Sent, kind, bytes);
        }
        self.set_phase(self.state.phase.on_send(kind));
        Ok(())
    }

    async fn next_fpdu(&mut self, awaiting: &'static str) -> PesitResult<Fpdu> {
        let after = self.config.receive_timeout;
        let (fpdu, bytes) = match timeout(after, self.reader.read_with_bytes()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(awaiting, ?after, "receive timed out");
                return Err(PesitError::Timeout { awaiting, after });
            }
        };
        if let Some(recorder) = &mut self.recorder {
            recorder.record(Direction::Received, fpdu.kind, &bytes);
        }
        Ok(fpdu)
    }

    async fn await_response(
        &mut self,
        expected: &[FpduType],
        awaiting: &'static str,
    ) -> PesitResult<Fpdu> {
        loop {
            let fpdu = self.next_fpdu(awaiting).await?;
            if expected.contains(&fpdu.kind) {
                if fpdu.is_positive() {
                    self.set_phase(self.state.phase.on_response(fpdu.kind));
                }
                return Ok(fpdu);
            }
            match fpdu.kind {
                FpduType::Abort => return Err(self.aborted_by_peer(&fpdu)),
                FpduType::AckSyn => self.on_sync_ack(&fpdu),
                other => warn!(fpdu = other.name(), awaiting, "skipping unexpected FPDU"),
            }
        }
    }

    fn aborted_by_peer(&mut self, abort: &Fpdu) -> PesitError {
        let diagnostic = abort.diagnostic().unwrap_or(DiagnosticCode::PROTOCOL_ERROR);
        warn!(%diagnostic, last_sync = self.last_sync(), "peer aborted");
        self.set_phase(SessionPhase::Aborted);
        PesitError::ProtocolAbort {
            diagnostic,
            last_sync: self.last_sync(),
            restart_point: self.state.restart_point,
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if phase != self.state.phase {
            debug!(from = ?self.state.phase, to = ?phase, "session phase");
            self.state.phase = phase;
        }
    }

    fn request(&self, kind: FpduType) -> Fpdu {
        Fpdu::new(kind, self.state.peer_id, self.state.local_id)
    }

    fn diagnostic_request(&self, kind: FpduType, diagnostic: DiagnosticCode) -> Fpdu {
        Fpdu::with_diagnostic(kind, self.state.peer_id, self.state.local_id, diagnostic)
    }

    async fn exchange_positive(&mut self, request: &Fpdu) -> PesitResult<Fpdu> {
        let ack = self.send_and_await_ack(request).await?;
        if ack.is_positive() {
            Ok(ack)
        } else {
            Err(PesitError::Rejected {
                kind: ack.kind,
                diagnostic: ack.diagnostic().unwrap_or_default(),
            })
        }
    }

    // -------------------------------------------------------------------------
    // Connection
    // -------------------------------------------------------------------------

    /// Send the legacy pre-connection message and wait for `ACK0`.
    pub async fn pre_connect(&mut self, message: &PreConnection) -> PesitResult<()> {
        write_entity(&mut self.writer, &message.encode()).await?;
        let after = self.config.receive_timeout;
        let response = timeout(after, self.reader.read_raw())
            .await
            .map_err(|_| PesitError::Timeout { awaiting: "ACK0", after })??;
        if is_ack0(&response) {
            info!(identifier = %message.identifier, "pre-connection accepted");
            Ok(())
        } else {
            Err(PesitError::PreConnectionRefused)
        }
    }

    /// Establish the connection.
    ///
    /// Sends CONNECT from our id to id 0 and learns the peer's id from the
    /// source id of ACONNECT. Returns the sync parameters in force, which
    /// are the responder's. RCONNECT fails with [`PesitError::Rejected`].
    pub async fn connect(&mut self, request: &ConnectRequest) -> PesitResult<NegotiatedSync> {
        let local_id = match self.config.local_id {
            Some(id) => id,
            None => rand::thread_rng().gen_range(1..=254),
        };
        self.state.local_id = local_id;
        self.state.peer_id = UNASSIGNED_CONNECTION_ID;

        let response = self
            .send_and_await_ack(&request.to_fpdu(UNASSIGNED_CONNECTION_ID, local_id))
            .await?;
        if response.kind == FpduType::Rconnect {
            self.set_phase(SessionPhase::Released);
            return Err(PesitError::Rejected {
                kind: FpduType::Rconnect,
                diagnostic: response.diagnostic().unwrap_or(DiagnosticCode::CONNECTION_ERROR),
            });
        }

        self.state.peer_id = response.id_src;
        let offered = SyncPointsDescriptor::from_fpdu(&response)
            .map_err(|err| PesitError::Parse(err.into()))?;
        let sync = NegotiatedSync::negotiate(request.sync_points, offered);
        self.state.sync = sync;
        self.sender = SyncPointTracker::new(sync);
        self.receiver = SyncPointReceiver::new(sync);

        info!(
            local_id,
            peer_id = self.state.peer_id,
            sync_interval = sync.interval_bytes,
            sync_window = sync.window,
            "connected"
        );
        Ok(sync)
    }

    /// RELEASE and wait for RELCONF.
    pub async fn release(&mut self, diagnostic: DiagnosticCode) -> PesitResult<Fpdu> {
        let request = self.diagnostic_request(FpduType::Release, diagnostic);
        self.send_and_await_ack(&request).await
    }

    /// Send ABORT. The connection is unusable afterwards.
    pub async fn abort(&mut self, diagnostic: DiagnosticCode) -> PesitResult<()> {
        warn!(%diagnostic, "aborting session");
        let request = self.diagnostic_request(FpduType::Abort, diagnostic);
        self.send(&request).await
    }

    // -------------------------------------------------------------------------
    // File selection
    // -------------------------------------------------------------------------

    /// CREATE a file on the peer (we send). Negative ACK_CREATE fails with
    /// [`PesitError::Rejected`].
    pub async fn create(&mut self, request: &CreateRequest) -> PesitResult<Fpdu> {
        let fpdu = request.to_fpdu(self.state.peer_id, self.state.local_id);
        let ack = self.exchange_positive(&fpdu).await?;
        self.begin_transfer(request.transfer_id, request.restart);
        Ok(ack)
    }

    /// SELECT a file on the peer (we receive). Negative ACK_SELECT fails
    /// with [`PesitError::Rejected`].
    pub async fn select(&mut self, request: &SelectRequest) -> PesitResult<Fpdu> {
        let fpdu = request.to_fpdu(self.state.peer_id, self.state.local_id);
        let ack = self.exchange_positive(&fpdu).await?;
        self.begin_transfer(request.transfer_id, request.restart);
        Ok(ack)
    }

    fn begin_transfer(&mut self, transfer_id: u32, restart: bool) {
        self.state.transfer_id = Some(transfer_id);
        self.state.restart_point = None;
        self.sender = SyncPointTracker::new(self.state.sync);
        self.receiver = SyncPointReceiver::new(self.state.sync);
        if restart {
            info!(transfer_id, "restarting transfer");
        }
    }

    /// OPEN the selected file.
    pub async fn open(&mut self) -> PesitResult<Fpdu> {
        let request = self.request(FpduType::Open);
        self.exchange_positive(&request).await
    }

    /// CLOSE the file.
    pub async fn close(&mut self, diagnostic: DiagnosticCode) -> PesitResult<Fpdu> {
        let request = self.diagnostic_request(FpduType::Close, diagnostic);
        self.exchange_positive(&request).await
    }

    /// DESELECT the file.
    pub async fn deselect(&mut self, diagnostic: DiagnosticCode) -> PesitResult<Fpdu> {
        let request = self.diagnostic_request(FpduType::Deselect, diagnostic);
        self.exchange_positive(&request).await
    }

    // -------------------------------------------------------------------------
    // Transfer
    // -------------------------------------------------------------------------

    /// WRITE: start sending data.
    ///
    /// Returns the restart point from ACK_WRITE (0 for a fresh transfer).
    /// Sync numbering continues after it and the caller resumes sending
    /// from [`resume_offset`](Self::resume_offset).
    pub async fn write(&mut self) -> PesitResult<u32> {
        let request = self.request(FpduType::Write);
        let ack = self.exchange_positive(&request).await?;
        let point = restart_point(&ack).unwrap_or(0);
        self.state.restart_point = Some(point);
        self.sender = SyncPointTracker::new(self.state.sync);
        if point > 0 {
            self.sender.resume_from(point);
            info!(restart_point = point, offset = self.resume_offset(), "resuming write");
        }
        Ok(point)
    }

    /// READ: start receiving data.
    ///
    /// Returns the restart point from ACK_READ, or the requested one when
    /// the acknowledgement does not carry PI 18.
    pub async fn read(&mut self, request: &ReadRequest) -> PesitResult<u32> {
        let fpdu = request.to_fpdu(self.state.peer_id, self.state.local_id);
        let ack = self.exchange_positive(&fpdu).await?;
        let point = restart_point(&ack).unwrap_or(request.restart_point);
        self.state.restart_point = Some(point);
        self.receiver = SyncPointReceiver::new(self.state.sync);
        if point > 0 {
            self.receiver.resume_from(point);
            info!(restart_point = point, offset = self.resume_offset(), "resuming read");
        }
        Ok(point)
    }

    /// Send file data as DTF FPDUs.
    ///
    /// Data is cut into chunks that fit the maximum entity size and the
    /// sync interval. A SYN is emitted before any chunk that would cross
    /// the interval, and when the window is full this waits for ACK_SYN.
    pub async fn send_data(&mut self, data: &[u8]) -> PesitResult<()> {
        let mut chunk_size =
            usize::from(self.config.max_entity_size).saturating_sub(FPDU_HEADER_SIZE);
        if self.state.sync.is_enabled() {
            let interval = usize::try_from(self.state.sync.interval_bytes).unwrap_or(usize::MAX);
            chunk_size = chunk_size.min(interval);
        }

        for chunk in data.chunks(chunk_size.max(1)) {
            if let Some(sync) = self.sender.on_chunk(chunk.len()) {
                self.emit_sync(sync).await?;
            }
            let (dst, src) = (self.state.peer_id, self.state.local_id);
            let fpdu = Fpdu::with_data(FpduType::Dtf, dst, src, chunk.to_vec());
            self.send(&fpdu).await?;
        }
        Ok(())
    }

    /// Send records, packing as many as fit into each multi-article DTF.
    pub async fn send_articles<A: AsRef<[u8]>>(&mut self, articles: &[A]) -> PesitResult<()> {
        let max = usize::from(self.config.max_entity_size);
        let mut start = 0;
        while start < articles.len() {
            let mut size = FPDU_HEADER_SIZE + 2 + articles[start].as_ref().len();
            let mut end = start + 1;
            while end < articles.len()
                && end - start < usize::from(u8::MAX)
                && size + 2 + articles[end].as_ref().len() <= max
            {
                size += 2 + articles[end].as_ref().len();
                end += 1;
            }

            let batch = &articles[start..end];
            let bytes = build_multi_article(FpduType::Dtf, self.state.peer_id, batch, max)
                .ok_or(BuildError::TooLarge { length: size })?;
            // Only record bytes count toward the interval, not the length prefixes.
            let payload = batch.iter().map(|a| a.as_ref().len()).sum();
            if let Some(sync) = self.sender.on_chunk(payload) {
                self.emit_sync(sync).await?;
            }
            self.send_encoded(FpduType::Dtf, &bytes).await?;
            start = end;
        }
        Ok(())
    }

    async fn emit_sync(&mut self, sync: u32) -> PesitResult<()> {
        let request = self
            .request(FpduType::Syn)
            .push(Parameter::numeric(ParameterId::SyncNumber, u64::from(sync)));
        self.send(&request).await?;
        debug!(sync, "sync point sent");

        while self.sender.must_await_ack() {
            let ack = self.await_response(&[FpduType::AckSyn], FpduType::AckSyn.name()).await?;
            self.on_sync_ack(&ack);
        }
        Ok(())
    }

    fn on_sync_ack(&mut self, ack: &Fpdu) {
        let sync = ack
            .numeric(ParameterId::SyncNumber)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);
        if self.sender.acknowledge(sync) {
            debug!(sync, "sync point acknowledged");
        } else {
            let last_sync = self.sender.last_sync();
            warn!(sync, last_sync, "acknowledgement for unknown sync point");
        }
    }

    /// DTF_END: no more data. Not acknowledged.
    pub async fn end_data(&mut self, diagnostic: DiagnosticCode) -> PesitResult<()> {
        let request = self.diagnostic_request(FpduType::DtfEnd, diagnostic);
        self.send(&request).await
    }

    /// TRANS_END and wait for ACK_TRANS_END.
    pub async fn end_transfer(&mut self) -> PesitResult<Fpdu> {
        let request = self.request(FpduType::TransEnd);
        self.exchange_positive(&request).await
    }

    /// IDT: interrupt the transfer, keeping the connection.
    ///
    /// The peer keeps its last durable sync point for a later restart.
    pub async fn interrupt(&mut self, diagnostic: DiagnosticCode) -> PesitResult<Fpdu> {
        info!(last_sync = self.last_sync(), %diagnostic, "interrupting transfer");
        let request = self.diagnostic_request(FpduType::Idt, diagnostic);
        self.send_and_await_ack(&request).await
    }

    /// Receive the next data event after READ.
    ///
    /// Sync points are validated and acknowledged with ACK_SYN unless the
    /// window is 0.
    pub async fn next_data(&mut self) -> PesitResult<DataEvent> {
        let fpdu = self.next_fpdu("DTF").await?;
        match fpdu.kind {
            kind if kind.is_data() => {
                self.receiver.on_data(fpdu.data().map_or(0, <[u8]>::len));
                Ok(DataEvent::Data(fpdu))
            }
            FpduType::Syn => {
                let sync = fpdu
                    .numeric(ParameterId::SyncNumber)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(0);
                match self.receiver.on_sync(sync) {
                    SyncReceipt::Acknowledge(sync) => {
                        let ack = self
                            .request(FpduType::AckSyn)
                            .push(Parameter::numeric(ParameterId::SyncNumber, u64::from(sync)));
                        self.send(&ack).await?;
                        Ok(DataEvent::SyncPoint(sync))
                    }
                    SyncReceipt::Silent(sync) => Ok(DataEvent::SyncPoint(sync)),
                    SyncReceipt::OutOfOrder { expected, actual } => {
                        Err(PesitError::SyncOutOfOrder { expected, actual })
                    }
                }
            }
            FpduType::DtfEnd => Ok(DataEvent::End(fpdu.diagnostic().unwrap_or_default())),
            FpduType::Abort => Err(self.aborted_by_peer(&fpdu)),
            actual => Err(PesitError::UnexpectedFpdu {
                expected: FpduType::Dtf,
                actual,
            }),
        }
    }
}
