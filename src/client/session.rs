// ABOUTME: One bound SMPP session over one connection, driven by a reader task and a writer task
// ABOUTME: Binds before anything else is written, correlates responses and unbinds on stop

use super::config::SessionConfig;
use super::error::{SmppError, SmppResult};
use crate::codec::Frame;
use crate::connection::{connect, Connection, ConnectionReader, ConnectionWriter, WireError, POLL_SLICE};
use crate::correlation::{CorrelationTable, PendingRequest, SequenceGenerator};
use crate::datatypes::{CommandId, Unbind};
use crate::queue::WorkQueue;
use crate::shutdown::Shutdown;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifecycle of a session. `Failed` and `Stopped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    Binding = 2,
    Bound = 3,
    Failed = 4,
    Stopped = 5,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Disconnected,
            1 => SessionState::Connecting,
            2 => SessionState::Binding,
            3 => SessionState::Bound,
            4 => SessionState::Failed,
            _ => SessionState::Stopped,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Failed | SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Atomic state cell whose changes can be awaited
#[derive(Debug)]
struct StateCell {
    value: AtomicU8,
    changed: Notify,
}

impl StateCell {
    fn new() -> Self {
        Self {
            value: AtomicU8::new(SessionState::Disconnected as u8),
            changed: Notify::new(),
        }
    }

    fn get(&self) -> SessionState {
        SessionState::from_u8(self.value.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`; fails if the state is something else
    fn advance(&self, from: SessionState, to: SessionState) -> bool {
        let moved = self
            .value
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            self.changed.notify_waiters();
        }
        moved
    }

    /// Enter a terminal state unless one was already reached
    fn finish(&self, to: SessionState) -> bool {
        let result = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (!SessionState::from_u8(current).is_terminal()).then_some(to as u8)
            });
        self.changed.notify_waiters();
        result.is_ok()
    }

    async fn wait_until(
        &self,
        done: impl Fn(SessionState) -> bool,
        deadline: Instant,
    ) -> Option<SessionState> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let state = self.get();
            if done(state) {
                return Some(state);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }
}

/// An item waiting to be written by the writer task
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Registered in the correlation table right before it is written
    Request(PendingRequest),
    Response(Frame),
}

/// Queues and correlation state that may outlive a single session.
///
/// The supervisor hands the same channels to every session it creates, so
/// requests queued while reconnecting are written once a new session binds.
#[derive(Debug, Clone)]
pub struct SessionChannels {
    pub(crate) inbound: Arc<WorkQueue<Frame>>,
    pub(crate) outbound: Arc<WorkQueue<Outbound>>,
    pub(crate) table: Arc<CorrelationTable>,
    pub(crate) sequence: Arc<SequenceGenerator>,
}

impl SessionChannels {
    pub fn new() -> Self {
        Self::with_table(CorrelationTable::new())
    }

    pub fn with_table(table: CorrelationTable) -> Self {
        Self {
            inbound: Arc::new(WorkQueue::new()),
            outbound: Arc::new(WorkQueue::new()),
            table: Arc::new(table),
            sequence: Arc::new(SequenceGenerator::new()),
        }
    }

    /// Requests received from the SMSC that await handling
    pub fn inbound(&self) -> &WorkQueue<Frame> {
        &self.inbound
    }

    pub fn table(&self) -> &CorrelationTable {
        &self.table
    }
}

impl Default for SessionChannels {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by the session handle and its two tasks
struct Shared {
    config: Arc<SessionConfig>,
    channels: SessionChannels,
    state: StateCell,

    /// Raised by `stop()` and on failure; ends the writer loop
    writer_shutdown: Shutdown,

    /// Raised once the writer is done; ends the reader loop
    reader_shutdown: Shutdown,

    unmatched_responses: AtomicU32,
    failure: Mutex<Option<SmppError>>,
}

impl Shared {
    /// Mark the session failed and wind both tasks down
    fn fail(&self, error: SmppError) {
        if self.state.finish(SessionState::Failed) {
            error!("SMPP session with {} failed: {}", self.config.server_address, error);
            *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
        }
        self.writer_shutdown.trigger();
        self.reader_shutdown.trigger();
    }

    fn take_failure(&self) -> Option<SmppError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether a read or write error is part of an orderly stop
    fn stopping(&self) -> bool {
        self.writer_shutdown.is_triggered() && self.state.get() != SessionState::Failed
    }

    /// Queue `frame` for the writer; requests get a fresh sequence number
    fn enqueue(&self, mut frame: Frame) -> SmppResult<Option<PendingRequest>> {
        if self.state.get().is_terminal() || self.writer_shutdown.is_triggered() {
            return Err(SmppError::Unavailable);
        }

        if frame.is_response() {
            self.channels.outbound.push(Outbound::Response(frame));
            return Ok(None);
        }

        frame.set_sequence_number(self.channels.sequence.next_sequence());
        let pending = PendingRequest::new(frame);
        self.channels.outbound.push(Outbound::Request(pending.clone()));
        Ok(Some(pending))
    }

    async fn send(&self, frame: Frame, timeout: Option<Duration>) -> SmppResult<Option<Frame>> {
        let Some(pending) = self.enqueue(frame)? else {
            return Ok(None);
        };
        let Some(timeout) = timeout else {
            return Ok(None);
        };

        let response = pending
            .wait(timeout.min(self.config.response_timeout))
            .await
            .ok_or(SmppError::Timeout)?;

        let status = response.command_status();
        if !status.is_ok() {
            return Err(SmppError::Protocol(status));
        }
        Ok(Some(response))
    }
}

/// A single SMPP session: one connection, one bind, one lifetime.
///
/// Once `Failed` or `Stopped` a session cannot be restarted; create a new
/// one (the [`Supervisor`](super::Supervisor) does this automatically).
pub struct Session {
    shared: Arc<Shared>,

    /// Reader and writer handles; `stop()` holds the lock until both are joined
    tasks: tokio::sync::Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> SmppResult<Self> {
        Self::with_channels(config, SessionChannels::new())
    }

    /// A session that reads from and writes to existing channels
    pub fn with_channels(config: SessionConfig, channels: SessionChannels) -> SmppResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(Arc::new(config), channels))
    }

    pub(crate) fn from_parts(config: Arc<SessionConfig>, channels: SessionChannels) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                channels,
                state: StateCell::new(),
                writer_shutdown: Shutdown::new(),
                reader_shutdown: Shutdown::new(),
                unmatched_responses: AtomicU32::new(0),
                failure: Mutex::new(None),
            }),
            tasks: tokio::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    pub fn failed(&self) -> bool {
        self.state() == SessionState::Failed
    }

    /// Whether the session stopped or is on its way there
    pub fn ceased(&self) -> bool {
        self.state().is_terminal() || self.shared.writer_shutdown.is_triggered()
    }

    pub fn channels(&self) -> &SessionChannels {
        &self.shared.channels
    }

    /// Responses that arrived with no request waiting for them
    pub fn unmatched_responses(&self) -> u32 {
        self.shared.unmatched_responses.load(Ordering::Relaxed)
    }

    /// Connect to the configured SMSC and bind
    pub async fn start(&self) -> SmppResult<()> {
        self.begin()?;
        let config = &self.shared.config;
        let deadline = Instant::now() + config.connect_timeout;

        info!("Connecting to SMSC at {}", config.server_address);
        match connect(&config.server_address, config.connect_timeout).await {
            Ok(stream) => self.launch(stream, deadline).await,
            Err(e) => {
                self.shared.fail(SmppError::Wire(e));
                self.stop().await;
                Err(self.shared.take_failure().unwrap_or(SmppError::Unavailable))
            }
        }
    }

    /// Bind over an already connected stream
    pub async fn start_with_stream<S>(&self, stream: S) -> SmppResult<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        self.begin()?;
        let deadline = Instant::now() + self.shared.config.connect_timeout;
        self.launch(stream, deadline).await
    }

    fn begin(&self) -> SmppResult<()> {
        if self
            .shared
            .state
            .advance(SessionState::Disconnected, SessionState::Connecting)
        {
            Ok(())
        } else {
            Err(SmppError::InvalidState(format!(
                "session cannot be started from state {}",
                self.state()
            )))
        }
    }

    async fn launch<S>(&self, stream: S, bind_deadline: Instant) -> SmppResult<()>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = Connection::new(stream).into_split();
        self.shared
            .state
            .advance(SessionState::Connecting, SessionState::Binding);

        let reader = tokio::spawn(reader_task(reader, self.shared.clone()));
        let writer = tokio::spawn(writer_task(writer, self.shared.clone(), bind_deadline));
        *self.tasks.lock().await = Some((reader, writer));

        // The writer enforces the bind deadline itself; the margin covers its last poll
        let outcome = self
            .shared
            .state
            .wait_until(
                |state| state == SessionState::Bound || state.is_terminal(),
                bind_deadline + POLL_SLICE,
            )
            .await;

        match outcome {
            Some(SessionState::Bound) => Ok(()),
            Some(SessionState::Stopped) => Err(SmppError::InvalidState(
                "session was stopped while binding".into(),
            )),
            Some(_) => {
                self.stop().await;
                Err(self
                    .shared
                    .take_failure()
                    .unwrap_or_else(|| SmppError::BindFailed("session failed while binding".into())))
            }
            None => {
                self.shared.fail(SmppError::Timeout);
                self.stop().await;
                Err(self.shared.take_failure().unwrap_or(SmppError::Timeout))
            }
        }
    }

    /// Send a PDU through this session.
    ///
    /// Requests get a fresh sequence number. With `Some(timeout)` the call
    /// waits for the response, at most `response_timeout`; with `None` it
    /// returns as soon as the PDU is queued. Responses are always queued
    /// without waiting.
    pub async fn send(&self, frame: Frame, timeout: Option<Duration>) -> SmppResult<Option<Frame>> {
        self.shared.send(frame, timeout).await
    }

    /// Queue without waiting; requests hand back their response slot
    pub(crate) fn queue(&self, frame: Frame) -> SmppResult<Option<PendingRequest>> {
        self.shared.enqueue(frame)
    }

    /// Mark the session failed, e.g. after a liveness check went unanswered
    pub fn fail(&self, reason: impl Into<String>) {
        self.shared
            .fail(SmppError::InvalidState(reason.into()));
    }

    /// Unbind and disconnect. Safe to call repeatedly and from any task;
    /// concurrent callers all return once the first one has finished.
    pub async fn stop(&self) {
        let first = self.shared.writer_shutdown.trigger();
        let mut tasks = self.tasks.lock().await;

        if let Some((reader, writer)) = tasks.take() {
            // The writer unbinds and needs the reader to see the response
            if let Err(e) = writer.await {
                error!("SMPP writer task ended abnormally: {}", e);
            }
            self.shared.reader_shutdown.trigger();
            if let Err(e) = reader.await {
                error!("SMPP reader task ended abnormally: {}", e);
            }
        } else {
            self.shared.reader_shutdown.trigger();
        }
        drop(tasks);

        self.shared.state.finish(SessionState::Stopped);
        if first {
            info!(
                "SMPP session with {} stopped ({})",
                self.shared.config.server_address,
                self.state()
            );
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("server_address", &self.shared.config.server_address)
            .field("state", &self.state())
            .finish()
    }
}

async fn reader_task<S: AsyncRead>(mut reader: ConnectionReader<S>, shared: Arc<Shared>) {
    let shutdown = shared.reader_shutdown.clone();

    loop {
        let frame = tokio::select! {
            result = reader.read_frame(&shutdown) => result,
            _ = shutdown.triggered() => Err(WireError::Cancelled),
        };

        match frame {
            Ok(frame) => handle_incoming(&shared, frame),
            Err(WireError::Cancelled) => break,
            Err(e) if shared.stopping() => {
                debug!("Reader finished while stopping: {}", e);
                break;
            }
            Err(WireError::Closed) => {
                shared.fail(SmppError::ConnectionClosed);
                break;
            }
            Err(e) => {
                shared.fail(SmppError::Wire(e));
                break;
            }
        }
    }

    debug!("SMPP reader task exiting");
}

fn handle_incoming(shared: &Shared, frame: Frame) {
    debug!(
        "<< {} seq={} status={:?}",
        frame.name(),
        frame.sequence_number(),
        frame.command_status()
    );

    if !frame.is_response() {
        shared.channels.inbound.push(frame);
        return;
    }

    match shared.channels.table.remove(frame.sequence_number()) {
        Some(pending) => {
            debug!(
                "{} seq={} answered after {:?}",
                pending.request().name(),
                frame.sequence_number(),
                pending.created().elapsed()
            );
            pending.resolve(frame);
        }
        None => {
            let count = shared.unmatched_responses.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                "Response without matching request: {} seq={}",
                frame.name(),
                frame.sequence_number()
            );
            if let Some(limit) = shared.config.max_unmatched_responses {
                if count > limit {
                    shared.fail(SmppError::InvalidState(format!(
                        "{count} responses arrived without a matching request"
                    )));
                }
            }
        }
    }
}

async fn writer_task<S: AsyncWrite>(
    mut writer: ConnectionWriter<S>,
    shared: Arc<Shared>,
    bind_deadline: Instant,
) {
    if let Err(e) = bind(&mut writer, &shared, bind_deadline).await {
        if !shared.writer_shutdown.is_triggered() || shared.state.get() == SessionState::Failed {
            shared.fail(e);
        }
        writer.close().await;
        return;
    }

    if !shared.state.advance(SessionState::Binding, SessionState::Bound) {
        writer.close().await;
        return;
    }
    let credentials = &shared.config.credentials;
    info!(
        "Bound to {} as {} (system_id '{}')",
        shared.config.server_address, credentials.bind_type, credentials.system_id
    );

    if let Err(e) = drain_outbound(&mut writer, &shared).await {
        shared.fail(e);
    }

    if shared.state.get() == SessionState::Bound {
        unbind(&mut writer, &shared).await;
    }
    writer.close().await;
    debug!("SMPP writer task exiting");
}

/// Register `pending` and write its request
async fn write_request<S: AsyncWrite>(
    writer: &mut ConnectionWriter<S>,
    shared: &Shared,
    pending: &PendingRequest,
    allow_during_shutdown: bool,
    timeout: Duration,
) -> SmppResult<()> {
    let frame = pending.request();
    let sequence_number = frame.sequence_number();
    shared
        .channels
        .table
        .add(sequence_number, pending.clone())
        .map_err(|e| SmppError::InvalidState(e.to_string()))?;

    debug!(">> {} seq={}", frame.name(), sequence_number);
    let written = writer
        .write_frame(frame, allow_during_shutdown, timeout, &shared.writer_shutdown)
        .await;
    if let Err(e) = written {
        // Nothing will answer a request that never left
        shared.channels.table.remove(sequence_number);
        return Err(e.into());
    }
    Ok(())
}

async fn bind<S: AsyncWrite>(
    writer: &mut ConnectionWriter<S>,
    shared: &Shared,
    deadline: Instant,
) -> SmppResult<()> {
    let credentials = &shared.config.credentials;
    let mut frame = credentials.bind_frame();
    frame.set_sequence_number(shared.channels.sequence.next_sequence());
    let pending = PendingRequest::new(frame);

    let remaining = deadline.saturating_duration_since(Instant::now());
    write_request(writer, shared, &pending, false, remaining).await?;

    let remaining = deadline.saturating_duration_since(Instant::now());
    let response = tokio::select! {
        response = pending.wait(remaining) => response.ok_or(SmppError::Timeout)?,
        _ = shared.writer_shutdown.triggered() => return Err(SmppError::Unavailable),
    };

    let expected = credentials.bind_type.response_id();
    let status = response.command_status();
    if !status.is_ok() {
        return Err(SmppError::BindFailed(format!(
            "{} rejected by SMSC with {}",
            credentials.bind_type, status
        )));
    }
    if response.command_id() != expected {
        return Err(SmppError::UnexpectedPdu {
            expected,
            actual: response.command_id(),
        });
    }
    Ok(())
}

async fn drain_outbound<S: AsyncWrite>(
    writer: &mut ConnectionWriter<S>,
    shared: &Shared,
) -> SmppResult<()> {
    let shutdown = &shared.writer_shutdown;
    let write_timeout = shared.config.response_timeout;

    while !shutdown.is_triggered() {
        let item = tokio::select! {
            item = shared.channels.outbound.pop(POLL_SLICE) => item,
            _ = shutdown.triggered() => None,
        };

        let result = match item {
            None => continue,
            Some(Outbound::Request(pending)) => {
                write_request(writer, shared, &pending, false, write_timeout).await
            }
            Some(Outbound::Response(frame)) => {
                debug!(
                    ">> {} seq={} status={:?}",
                    frame.name(),
                    frame.sequence_number(),
                    frame.command_status()
                );
                writer
                    .write_frame(&frame, false, write_timeout, shutdown)
                    .await
                    .map_err(SmppError::from)
            }
        };

        match result {
            Ok(()) => {}
            Err(SmppError::Wire(WireError::Cancelled)) => break,
            Err(SmppError::InvalidState(reason)) => {
                // The caller waiting on this request will time out
                error!("Dropping outbound request: {}", reason);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn unbind<S: AsyncWrite>(writer: &mut ConnectionWriter<S>, shared: &Shared) {
    let timeout = shared.config.response_timeout;
    let sequence_number = shared.channels.sequence.next_sequence();
    let pending = PendingRequest::new(Frame::Unbind(Unbind::new(sequence_number)));

    if let Err(e) = write_request(writer, shared, &pending, true, timeout).await {
        warn!("Failed to send unbind: {}", e);
        return;
    }

    match pending.wait(timeout).await {
        Some(response) if response.command_id() == CommandId::UnbindResp => {
            debug!("Unbind acknowledged by SMSC");
        }
        Some(response) => warn!("Unexpected response to unbind: {}", response.name()),
        None => warn!("No response to unbind within {:?}", timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{
        BindTransceiverResponse, CommandStatus, EnquireLink, EnquireLinkResponse, UnbindResponse,
    };
    use tokio::io::DuplexStream;

    fn config() -> SessionConfig {
        SessionConfig::new("in-memory:0")
            .with_credentials("esme", "secret")
            .with_connect_timeout(Duration::from_secs(2))
            .with_response_timeout(Duration::from_secs(1))
    }

    /// In-memory SMSC answering binds, pings and unbinds
    async fn fake_smsc(stream: DuplexStream, bind_status: CommandStatus) {
        let (mut reader, mut writer) = Connection::new(stream).into_split();
        let shutdown = Shutdown::new();

        while let Ok(frame) = reader.read_frame(&shutdown).await {
            let sequence_number = frame.sequence_number();
            let response = match frame {
                Frame::BindTransceiver(_) if bind_status.is_ok() => Frame::BindTransceiverResp(
                    BindTransceiverResponse::new(sequence_number, "SMSC"),
                ),
                Frame::BindTransceiver(_) => Frame::BindTransceiverResp(
                    BindTransceiverResponse::error(sequence_number, bind_status),
                ),
                Frame::EnquireLink(_) => {
                    Frame::EnquireLinkResp(EnquireLinkResponse::new(sequence_number))
                }
                Frame::Unbind(_) => Frame::UnbindResp(UnbindResponse::new(sequence_number)),
                _ => continue,
            };
            if writer
                .write_frame(&response, false, Duration::from_secs(1), &shutdown)
                .await
                .is_err()
            {
                break;
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn binds_sends_and_stops() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(fake_smsc(server, CommandStatus::Ok));

        let session = Session::new(config()).unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);

        session.start_with_stream(client).await.unwrap();
        assert_eq!(session.state(), SessionState::Bound);

        let response = session
            .send(Frame::EnquireLink(EnquireLink::new(1)), Some(Duration::from_secs(1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.command_id(), CommandId::EnquireLinkResp);

        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.ceased());
        assert!(session.channels().table().is_empty());

        // Stopping again is harmless, sending is not possible any more
        session.stop().await;
        let result = session
            .send(Frame::EnquireLink(EnquireLink::new(1)), None)
            .await;
        assert!(matches!(result, Err(SmppError::Unavailable)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejected_bind_fails_session() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(fake_smsc(server, CommandStatus::InvalidPassword));

        let session = Session::new(config()).unwrap();
        let result = session.start_with_stream(client).await;

        assert!(matches!(result, Err(SmppError::BindFailed(_))));
        assert!(session.failed());

        // Terminal: a failed session cannot be started again
        let (client, _server) = tokio::io::duplex(64);
        assert!(matches!(
            session.start_with_stream(client).await,
            Err(SmppError::InvalidState(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn peer_disconnect_fails_bound_session() {
        let (client, server) = tokio::io::duplex(4096);
        let smsc = tokio::spawn(async move {
            let (mut reader, mut writer) = Connection::new(server).into_split();
            let shutdown = Shutdown::new();
            let bind = reader.read_frame(&shutdown).await.unwrap();
            let response = Frame::BindTransceiverResp(BindTransceiverResponse::new(
                bind.sequence_number(),
                "SMSC",
            ));
            writer
                .write_frame(&response, false, Duration::from_secs(1), &shutdown)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            // Dropping both halves closes the stream
        });

        let session = Session::new(config()).unwrap();
        session.start_with_stream(client).await.unwrap();
        smsc.await.unwrap();

        let state = session
            .shared
            .state
            .wait_until(SessionState::is_terminal, Instant::now() + Duration::from_secs(3))
            .await;
        assert_eq!(state, Some(SessionState::Failed));

        session.stop().await;
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(
            session.shared.take_failure(),
            Some(SmppError::ConnectionClosed)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unmatched_responses_can_fail_session() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let (mut reader, mut writer) = Connection::new(server).into_split();
            let shutdown = Shutdown::new();
            let bind = reader.read_frame(&shutdown).await.unwrap();
            let bind_resp =
                Frame::BindTransceiverResp(BindTransceiverResponse::new(bind.sequence_number(), "SMSC"));
            writer
                .write_frame(&bind_resp, false, Duration::from_secs(1), &shutdown)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;

            for seq in 1000..1003 {
                let response = Frame::EnquireLinkResp(EnquireLinkResponse::new(seq));
                writer
                    .write_frame(&response, false, Duration::from_secs(1), &shutdown)
                    .await
                    .unwrap();
            }
            // Keep the connection open
            let _ = reader.read_frame(&shutdown).await;
        });

        let session = Session::new(config().with_max_unmatched_responses(2)).unwrap();
        session.start_with_stream(client).await.unwrap();

        let state = session
            .shared
            .state
            .wait_until(SessionState::is_terminal, Instant::now() + Duration::from_secs(3))
            .await;
        assert_eq!(state, Some(SessionState::Failed));
        assert_eq!(session.unmatched_responses(), 3);
        session.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_stops_wait_for_unbind_response() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let (mut reader, mut writer) = Connection::new(server).into_split();
            let shutdown = Shutdown::new();
            while let Ok(frame) = reader.read_frame(&shutdown).await {
                let sequence_number = frame.sequence_number();
                let response = match frame {
                    Frame::BindTransceiver(_) => Frame::BindTransceiverResp(
                        BindTransceiverResponse::new(sequence_number, "SMSC"),
                    ),
                    Frame::Unbind(_) => {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Frame::UnbindResp(UnbindResponse::new(sequence_number))
                    }
                    _ => continue,
                };
                let _ = writer
                    .write_frame(&response, false, Duration::from_secs(1), &shutdown)
                    .await;
            }
        });

        let session = Session::new(config()).unwrap();
        session.start_with_stream(client).await.unwrap();

        let started = Instant::now();
        let first = async {
            session.stop().await;
            started.elapsed()
        };
        let second = async {
            session.stop().await;
            started.elapsed()
        };
        let (first, second) = tokio::join!(first, second);

        // Neither call returns before the unbind is answered
        assert!(first >= Duration::from_millis(200), "{first:?}");
        assert!(second >= Duration::from_millis(200), "{second:?}");
        assert!(first.max(second) < Duration::from_millis(900));

        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.channels().table().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unanswered_bind_times_out() {
        let (client, server) = tokio::io::duplex(4096);
        let smsc = tokio::spawn(async move {
            let (mut reader, _writer) = Connection::new(server).into_split();
            let shutdown = Shutdown::new();
            while reader.read_frame(&shutdown).await.is_ok() {}
        });

        let session = Session::new(config().with_connect_timeout(Duration::from_millis(500))).unwrap();
        let started = Instant::now();
        let result = session.start_with_stream(client).await;

        assert!(matches!(result, Err(SmppError::Timeout)), "{result:?}");
        assert_eq!(session.state(), SessionState::Failed);
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_secs(3));
        smsc.abort();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_pdu_fails_bound_session() {
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let (mut reader, mut writer) = Connection::new(server).into_split();
            let shutdown = Shutdown::new();
            let bind = reader.read_frame(&shutdown).await.unwrap();
            let bind_resp =
                Frame::BindTransceiverResp(BindTransceiverResponse::new(bind.sequence_number(), "SMSC"));
            writer
                .write_frame(&bind_resp, false, Duration::from_secs(1), &shutdown)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;

            // command_length of 8 is shorter than the header itself
            let garbage = [0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x15];
            writer
                .write_all(&garbage, false, Duration::from_secs(1), &shutdown)
                .await
                .unwrap();
            let _ = reader.read_frame(&shutdown).await;
        });

        let session = Session::new(config()).unwrap();
        session.start_with_stream(client).await.unwrap();

        let state = session
            .shared
            .state
            .wait_until(SessionState::is_terminal, Instant::now() + Duration::from_secs(3))
            .await;
        assert_eq!(state, Some(SessionState::Failed));
        assert!(matches!(
            session.shared.take_failure(),
            Some(SmppError::Wire(WireError::Decode(_)))
        ));
        session.stop().await;
    }

    #[tokio::test]
    async fn failed_write_forgets_request() {
        let session = Session::new(config()).unwrap();
        let shared = session.shared.clone();
        let request = || {
            PendingRequest::new(Frame::EnquireLink(EnquireLink::new(
                shared.channels.sequence.next_sequence(),
            )))
        };

        // Peer gone: the write fails with an I/O error
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let (_reader, mut writer) = Connection::new(client).into_split();
        let result = write_request(&mut writer, &shared, &request(), false, Duration::from_secs(1)).await;
        assert!(result.is_err());
        assert!(shared.channels.table.is_empty());

        // Stopping: the write is cancelled before anything is sent
        let (client, _server) = tokio::io::duplex(64);
        let (_reader, mut writer) = Connection::new(client).into_split();
        shared.writer_shutdown.trigger();
        let result = write_request(&mut writer, &shared, &request(), false, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(SmppError::Wire(WireError::Cancelled))));
        assert!(shared.channels.table.is_empty());
    }
}
