// ABOUTME: Keeps one SMPP session bound across failures, pings it and dispatches inbound requests
// ABOUTME: Inbound requests other than pings and unbinds go to an application supplied handler

use super::config::SessionConfig;
use super::error::{SmppError, SmppResult};
use super::keepalive::{KeepAliveConfig, KeepAliveManager, KeepAliveStatus};
use super::session::{Session, SessionChannels, SessionState};
use super::types::SmsMessage;
use crate::codec::Frame;
use crate::connection::POLL_SLICE;
use crate::datatypes::{CommandStatus, EnquireLink};
use crate::shutdown::Shutdown;
use std::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What an inbound handler produces: the response to send back, if any
pub type HandlerResult = Result<Option<Frame>, Box<dyn Error + Send + Sync>>;

/// Application code for requests the SMSC sends us, e.g. `deliver_sm`.
///
/// Each request is handled on its own task. `Ok(Some(response))` is written
/// back to the SMSC; `Ok(None)` is answered with a `generic_nack` carrying
/// `ESME_RUNKNOWNERR`, and an error or panic with `ESME_RSYSERR`.
///
/// Implemented for every `Fn(Frame) -> impl Future<Output = HandlerResult>`,
/// so plain async functions and closures can be used directly.
pub trait InboundHandler: Send + Sync + 'static {
    fn handle(&self, request: Frame) -> impl Future<Output = HandlerResult> + Send;
}

impl<F, Fut> InboundHandler for F
where
    F: Fn(Frame) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn handle(&self, request: Frame) -> impl Future<Output = HandlerResult> + Send {
        self(request)
    }
}

struct Inner<H> {
    config: Arc<SessionConfig>,
    handler: Arc<H>,
    channels: SessionChannels,
    current: RwLock<Option<Arc<Session>>>,
    ceased: Shutdown,
    keep_alive: Mutex<KeepAliveManager>,
}

impl<H> Inner<H> {
    fn current(&self) -> Option<Arc<Session>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current(&self, session: Option<Arc<Session>>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn keep_alive(&self) -> MutexGuard<'_, KeepAliveManager> {
        self.keep_alive.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `delay` unless ceased first; true if still running
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = self.ceased.triggered() => false,
        }
    }
}

/// Owns the lifecycle of an SMPP session across reconnects.
///
/// ```rust,no_run
/// use smpp_session::client::{HandlerResult, SessionConfig, Supervisor};
/// use smpp_session::Frame;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SessionConfig::new("localhost:2775").with_credentials("esme", "secret");
/// let supervisor = Supervisor::new(config, |request: Frame| async move {
///     HandlerResult::Ok(request.create_response())
/// })?;
///
/// supervisor.start();
/// // ...
/// supervisor.cease().await;
/// # Ok(())
/// # }
/// ```
pub struct Supervisor<H> {
    inner: Arc<Inner<H>>,
    maintainer: Mutex<Option<JoinHandle<()>>>,
}

impl<H: InboundHandler> Supervisor<H> {
    pub fn new(config: SessionConfig, handler: H) -> SmppResult<Self> {
        Self::with_channels(config, handler, SessionChannels::new())
    }

    /// A supervisor whose sessions share the given queues and correlation table
    pub fn with_channels(
        config: SessionConfig,
        handler: H,
        channels: SessionChannels,
    ) -> SmppResult<Self> {
        config.validate()?;
        let keep_alive = KeepAliveConfig::for_session(config.ping_interval, config.response_timeout);

        Ok(Self {
            inner: Arc::new(Inner {
                config: Arc::new(config),
                handler: Arc::new(handler),
                channels,
                current: RwLock::new(None),
                ceased: Shutdown::new(),
                keep_alive: Mutex::new(KeepAliveManager::new(keep_alive)),
            }),
            maintainer: Mutex::new(None),
        })
    }

    /// Spawn the maintainer task. Must be called within a tokio runtime;
    /// repeated calls and calls after `cease()` do nothing.
    pub fn start(&self) {
        if self.inner.ceased.is_triggered() {
            return;
        }
        let mut maintainer = self.maintainer.lock().unwrap_or_else(PoisonError::into_inner);
        if maintainer.is_none() {
            *maintainer = Some(tokio::spawn(maintain(self.inner.clone())));
        }
    }

    /// Stop for good: unbind the current session and wait for the maintainer
    pub async fn cease(&self) {
        if self.inner.ceased.trigger() {
            info!("Ceasing SMPP supervisor for {}", self.inner.config.server_address);
        }

        let maintainer = self
            .maintainer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(maintainer) = maintainer {
            if let Err(e) = maintainer.await {
                error!("SMPP maintainer task ended abnormally: {}", e);
            }
        }
    }

    pub fn ceased(&self) -> bool {
        self.inner.ceased.is_triggered()
    }

    /// State of the current session, `Disconnected` between sessions
    pub fn state(&self) -> SessionState {
        self.inner
            .current()
            .map_or(SessionState::Disconnected, |session| session.state())
    }

    pub fn keep_alive_status(&self) -> KeepAliveStatus {
        self.inner.keep_alive().status()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Send through the current session; see [`Session::send`]
    pub async fn send(&self, frame: Frame, timeout: Option<Duration>) -> SmppResult<Option<Frame>> {
        if self.ceased() {
            return Err(SmppError::Unavailable);
        }
        match self.inner.current() {
            Some(session) if session.state() == SessionState::Bound => {
                session.send(frame, timeout).await
            }
            _ => Err(SmppError::Unavailable),
        }
    }

    /// Submit a short message, returning the message id assigned by the SMSC.
    ///
    /// In asynchronous submit mode the message is only queued and `None` is
    /// returned.
    pub async fn submit(&self, message: &SmsMessage) -> SmppResult<Option<String>> {
        let submit = &self.inner.config.submit;
        let frame = Frame::SubmitSm(Box::new(message.to_submit_sm(submit)?));

        if submit.asynchronous {
            self.send(frame, None).await?;
            return Ok(None);
        }

        match self
            .send(frame, Some(self.inner.config.request_timeout))
            .await?
        {
            Some(Frame::SubmitSmResp(response)) => Ok(Some(response.message_id)),
            Some(other) => Err(SmppError::UnexpectedPdu {
                expected: crate::datatypes::CommandId::SubmitSmResp,
                actual: other.command_id(),
            }),
            None => Err(SmppError::Timeout),
        }
    }
}

async fn maintain<H: InboundHandler>(inner: Arc<Inner<H>>) {
    let reconnect_delay = inner.config.reconnect_delay();

    while !inner.ceased.is_triggered() {
        let session = Arc::new(Session::from_parts(
            inner.config.clone(),
            inner.channels.clone(),
        ));
        inner.set_current(Some(session.clone()));

        let started = tokio::select! {
            result = session.start() => Some(result),
            _ = inner.ceased.triggered() => None,
        };

        match started {
            None => {
                session.stop().await;
                break;
            }
            Some(Err(e)) => {
                error!("Failed to establish SMPP session: {}", e);
                inner.set_current(None);
                info!("Reconnecting in {:?}", reconnect_delay);
                if !inner.pause(reconnect_delay).await {
                    break;
                }
                continue;
            }
            Some(Ok(())) => {}
        }

        inner.keep_alive().reset();
        serve(&inner, &session).await;

        session.stop().await;
        if !inner.ceased.is_triggered() {
            warn!("SMPP session ended ({}), reconnecting", session.state());
        }
    }

    inner.set_current(None);
    debug!("SMPP maintainer exiting");
}

/// Service a bound session until it fails or the supervisor ceases
async fn serve<H: InboundHandler>(inner: &Arc<Inner<H>>, session: &Arc<Session>) {
    while !inner.ceased.is_triggered() && !session.ceased() {
        if !keep_alive(inner, session) {
            break;
        }

        let request = tokio::select! {
            request = inner.channels.inbound.pop(POLL_SLICE) => request,
            _ = inner.ceased.triggered() => None,
        };
        if let Some(request) = request {
            dispatch(inner, session, request);
        }
    }
}

/// One keep-alive step; false when the link is considered dead
fn keep_alive<H>(inner: &Inner<H>, session: &Session) -> bool {
    let mut keep_alive = inner.keep_alive();
    keep_alive.check_response();

    if keep_alive.is_connection_failed() {
        drop(keep_alive);
        session.fail("enquire_link was not answered in time");
        return false;
    }

    if keep_alive.should_ping() {
        match session.queue(Frame::EnquireLink(EnquireLink::new(1))) {
            Ok(Some(ping)) => keep_alive.on_ping_sent(ping),
            Ok(None) => {}
            Err(e) => {
                warn!("Could not queue enquire_link: {}", e);
                keep_alive.on_ping_failure();
            }
        }
    }
    true
}

fn dispatch<H: InboundHandler>(inner: &Arc<Inner<H>>, session: &Arc<Session>, request: Frame) {
    match request {
        Frame::EnquireLink(_) | Frame::Unbind(_) => {
            if matches!(request, Frame::Unbind(_)) {
                info!("SMSC requested unbind");
            }
            if let Some(response) = request.create_response() {
                reply(session, response);
            }
        }
        request => {
            let handler = inner.handler.clone();
            let session = session.clone();
            tokio::spawn(async move {
                let original = request.clone();
                let outcome = tokio::spawn(async move { handler.handle(request).await }).await;

                let response = match outcome {
                    Ok(Ok(Some(response))) => response,
                    Ok(Ok(None)) => {
                        debug!("No answer for {}, sending generic_nack", original.name());
                        original.create_nack(CommandStatus::UnknownError)
                    }
                    Ok(Err(e)) => {
                        error!("Inbound handler failed for {}: {}", original.name(), e);
                        original.create_nack(CommandStatus::SystemError)
                    }
                    Err(e) => {
                        error!("Inbound handler panicked for {}: {}", original.name(), e);
                        original.create_nack(CommandStatus::SystemError)
                    }
                };
                reply(&session, response);
            });
        }
    }
}

fn reply(session: &Session, response: Frame) {
    if let Err(e) = session.queue(response) {
        warn!("Could not send response: {}", e);
    }
}
