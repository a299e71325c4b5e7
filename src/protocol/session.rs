//! # Session Context
//!
//! Owns the per-session plumbing the business logic modules rely on:
//! identity, the user-facing event channel, the transport-facing frame channel,
//! request/response correlation and the shared state.
//!
//! ## Correlation
//! Every outbound request is stamped with a fresh sequence number and parked in a
//! pending table. When the transport hands back a frame carrying that sequence, the
//! waiting request is completed with the frame's event instead of dispatching it.
//! Modules never see sequence numbers; they name the reply type and get it back.
//!
//! ## Lifecycle
//! ```text
//! Session::builder(uin).build()  ->  run(frames) / handle_frame(..)  ->  shutdown()
//! ```
//! Shutdown cancels every in-flight request with `ProtocolError::Cancelled`, waits
//! for handler tasks and clears the shared state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use crate::config::SessionConfig;
use crate::core::packer::CountPrefix;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::event::{EventKind, ProtocolEvent, ReplyEvent};
use crate::protocol::logic::{default_modules, BusinessLogic};
use crate::protocol::state::SessionState;
use crate::protocol::wire;
use crate::utils::crypto::Cryptor;
use crate::utils::metrics::SessionMetrics;
use crate::utils::timeout::with_timeout_error;

/// Frame handed to the transport for sending.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub sequence: u32,
    pub kind: EventKind,
    /// Encoded (and, if configured, encrypted) block
    pub payload: Bytes,
    pub event: ProtocolEvent,
}

/// Decoded frame delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    pub sequence: u32,
    pub event: ProtocolEvent,
}

impl InboundFrame {
    pub fn new(sequence: u32, event: impl Into<ProtocolEvent>) -> Self {
        Self {
            sequence,
            event: event.into(),
        }
    }
}

/// A handler or background task that ended in an error.
#[derive(Debug)]
pub struct HandlerFailure {
    /// Module name or task label
    pub source: &'static str,
    pub event: Option<EventKind>,
    pub error: ProtocolError,
}

/// Receiving ends handed to the embedding application.
#[derive(Debug)]
pub struct SessionChannels {
    /// Frames for the transport to send
    pub outbound: mpsc::Receiver<OutboundFrame>,
    /// Events for the user-facing layer
    pub entity: mpsc::UnboundedReceiver<ProtocolEvent>,
    /// Handler and background task failures
    pub errors: mpsc::UnboundedReceiver<HandlerFailure>,
}

type PendingTable = Mutex<HashMap<u32, oneshot::Sender<ProtocolEvent>>>;

struct Shared {
    uin: u64,
    config: SessionConfig,
    state: Arc<SessionState>,
    metrics: Arc<SessionMetrics>,
    dispatcher: Dispatcher,
    entity_tx: mpsc::UnboundedSender<ProtocolEvent>,
    outbound_tx: mpsc::Sender<OutboundFrame>,
    errors_tx: mpsc::UnboundedSender<HandlerFailure>,
    pending: PendingTable,
    next_sequence: AtomicU32,
    cryptor: Option<(Arc<dyn Cryptor>, Zeroizing<Vec<u8>>)>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// Handle given to business logic modules. Cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
    shared: Arc<Shared>,
}

/// Removes a pending entry however the request ends.
struct PendingGuard<'a> {
    pending: &'a PendingTable,
    sequence: u32,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.sequence);
        }
    }
}

impl SessionContext {
    /// Account identifier used to stamp outgoing frames.
    pub fn uin(&self) -> u64 {
        self.shared.uin
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.shared.state
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.shared.metrics
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn is_closed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Hand an event to the user-facing layer. Fire and forget.
    pub fn post_event_to_entity(&self, event: ProtocolEvent) {
        if let Err(mpsc::error::SendError(event)) = self.shared.entity_tx.send(event) {
            debug!(kind = %event.kind(), "Entity receiver closed; event dropped");
        }
    }

    /// Route an event through the registry as if it had just arrived.
    pub fn dispatch(&self, event: ProtocolEvent) {
        self.shared.dispatcher.dispatch(self, event);
    }

    /// Encode an event into the block that goes on the wire.
    pub fn encode(&self, event: &ProtocolEvent) -> Result<Bytes> {
        let codec = &self.shared.config.codec;
        let packer = wire::pack_event(event)?;
        let prefix = CountPrefix::from(codec.prefix_record_count);

        let payload = match (&self.shared.cryptor, codec.encrypt_outbound) {
            (Some((cryptor, key)), true) => {
                Bytes::from(packer.finalize_encrypted(prefix, cryptor.as_ref(), key)?)
            }
            _ => packer.to_bytes(prefix),
        };

        if payload.len() > codec.max_block_size {
            return Err(ProtocolError::OversizedPacket(payload.len()));
        }
        Ok(payload)
    }

    fn next_sequence(&self) -> u32 {
        self.shared.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Send `event` and wait for its single correlated reply.
    ///
    /// # Errors
    /// - `Timeout` if the frame is not taken and answered within the configured
    ///   response timeout
    /// - `UnexpectedReply` if the reply is a different event variant
    /// - `Cancelled` if the session shuts down first
    /// - `ConnectionClosed` if the transport dropped its outbound receiver
    /// - any encoding or cryptor error, unchanged
    #[instrument(skip(self, event), fields(expected = T::KIND.name()), level = "debug")]
    pub async fn send_request<T: ReplyEvent>(&self, event: impl Into<ProtocolEvent>) -> Result<T> {
        let event = event.into();
        if self.is_closed() {
            return Err(ProtocolError::Cancelled);
        }

        let payload = self.encode(&event)?;
        let sequence = self.next_sequence();
        let (reply_tx, reply_rx) = oneshot::channel();

        {
            let mut pending = self.shared.pending.lock().map_err(|_| {
                ProtocolError::SessionError(constants::ERR_LOCK_POISONED.to_string())
            })?;
            if pending.len() >= self.shared.config.dispatch.max_pending_requests {
                return Err(ProtocolError::SessionError(
                    constants::ERR_TOO_MANY_PENDING.to_string(),
                ));
            }
            pending.insert(sequence, reply_tx);
        }
        let _guard = PendingGuard {
            pending: &self.shared.pending,
            sequence,
        };

        let frame = OutboundFrame {
            sequence,
            kind: event.kind(),
            payload,
            event,
        };
        let timeout = self.shared.config.dispatch.response_timeout;

        // the bound covers a transport that stops draining as well as a missing reply
        let exchange = async {
            self.shared
                .outbound_tx
                .send(frame)
                .await
                .map_err(|_| ProtocolError::ConnectionClosed)?;
            self.shared.metrics.request_sent();
            debug!(sequence, "Request sent; awaiting reply");

            // a dropped sender means shutdown drained the table
            reply_rx.await.map_err(|_| ProtocolError::Cancelled)
        };

        let outcome = tokio::select! {
            biased;
            _ = self.shared.cancel.cancelled() => Err(ProtocolError::Cancelled),
            outcome = with_timeout_error(exchange, timeout) => outcome,
        };

        let reply = match outcome {
            Ok(reply) => reply,
            Err(error) => {
                match error {
                    ProtocolError::Timeout => {
                        self.shared.metrics.request_timeout();
                        warn!(sequence, "Request timed out");
                    }
                    ProtocolError::Cancelled => self.shared.metrics.request_cancelled(),
                    _ => {}
                }
                return Err(error);
            }
        };

        T::from_event(reply).map_err(|other| {
            warn!(sequence, received = %other.kind(), "Reply variant mismatch");
            ProtocolError::UnexpectedReply {
                expected: T::KIND.name(),
                received: other.kind().name(),
            }
        })
    }

    /// Run `fut` as a tracked background unit. An error is reported, not lost.
    pub fn spawn_supervised<F>(&self, label: &'static str, event: Option<EventKind>, fut: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let ctx = self.clone();
        self.spawn_tracked(async move {
            if let Err(error) = fut.await {
                ctx.report_failure(label, event, error);
            }
        });
    }

    pub(crate) fn spawn_tracked<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.tracker.spawn(fut);
    }

    pub(crate) fn report_failure(
        &self,
        source: &'static str,
        event: Option<EventKind>,
        error: ProtocolError,
    ) {
        self.shared.metrics.handler_failure();
        warn!(source, event = ?event, error = %error, "Handler failed");
        let _ = self.shared.errors_tx.send(HandlerFailure {
            source,
            event,
            error,
        });
    }

    /// Complete the pending request for `sequence`, if there is one.
    fn complete(&self, sequence: u32, event: ProtocolEvent) -> Option<ProtocolEvent> {
        let waiter = self
            .shared
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(&sequence));

        match waiter {
            Some(reply_tx) => {
                self.shared.metrics.reply_matched();
                if reply_tx.send(event).is_err() {
                    debug!(sequence, "Requester gone before reply arrived");
                }
                None
            }
            None => Some(event),
        }
    }

    fn pending_count(&self) -> usize {
        self.shared.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("uin", &self.shared.uin)
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for `Session`.
pub struct SessionBuilder {
    uin: u64,
    config: SessionConfig,
    modules: Option<Vec<Arc<dyn BusinessLogic>>>,
    cryptor: Option<(Arc<dyn Cryptor>, Zeroizing<Vec<u8>>)>,
}

impl SessionBuilder {
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default module list.
    pub fn with_modules(mut self, modules: Vec<Arc<dyn BusinessLogic>>) -> Self {
        self.modules = Some(modules);
        self
    }

    pub fn with_cryptor(mut self, cryptor: Arc<dyn Cryptor>, key: &[u8]) -> Self {
        self.cryptor = Some((cryptor, Zeroizing::new(key.to_vec())));
        self
    }

    pub fn build(self) -> Result<(Session, SessionChannels)> {
        if self.config.codec.encrypt_outbound && self.cryptor.is_none() {
            return Err(ProtocolError::ConfigError(
                "encrypt_outbound is set but no cryptor was supplied".to_string(),
            ));
        }

        let (outbound_tx, outbound) = mpsc::channel(self.config.dispatch.outbound_capacity.max(1));
        let (entity_tx, entity) = mpsc::unbounded_channel();
        let (errors_tx, errors) = mpsc::unbounded_channel();

        let modules = self.modules.unwrap_or_else(default_modules);
        let shared = Shared {
            uin: self.uin,
            config: self.config,
            state: Arc::new(SessionState::new()),
            metrics: Arc::new(SessionMetrics::new()),
            dispatcher: Dispatcher::new(modules),
            entity_tx,
            outbound_tx,
            errors_tx,
            pending: Mutex::new(HashMap::new()),
            next_sequence: AtomicU32::new(1),
            cryptor: self.cryptor,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        };

        info!(uin = self.uin, "Session created");
        let session = Session {
            ctx: SessionContext {
                shared: Arc::new(shared),
            },
        };
        Ok((
            session,
            SessionChannels {
                outbound,
                entity,
                errors,
            },
        ))
    }
}

/// One protocol session: intake of inbound frames plus the context modules use.
#[derive(Debug)]
pub struct Session {
    ctx: SessionContext,
}

impl Session {
    pub fn builder(uin: u64) -> SessionBuilder {
        SessionBuilder {
            uin,
            config: SessionConfig::default(),
            modules: None,
            cryptor: None,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn state(&self) -> &Arc<SessionState> {
        self.ctx.state()
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        self.ctx.metrics()
    }

    /// Accept one decoded frame: complete a pending request or dispatch it.
    pub fn handle_frame(&self, frame: InboundFrame) {
        if let Some(event) = self.ctx.complete(frame.sequence, frame.event) {
            self.ctx.dispatch(event);
        }
    }

    /// Decode a raw block and accept it.
    ///
    /// A decode failure is returned to the caller and leaves the session usable.
    pub fn handle_raw(&self, sequence: u32, kind_code: u16, payload: &[u8]) -> Result<()> {
        let event = wire::decode_event_code(kind_code, payload).map_err(|error| {
            self.ctx.metrics().decode_failure();
            warn!(sequence, kind_code, error = %error, "Failed to decode inbound frame");
            error
        })?;
        self.handle_frame(InboundFrame { sequence, event });
        Ok(())
    }

    /// Process frames in arrival order until the stream ends or the session closes.
    #[instrument(skip(self, frames), fields(uin = self.ctx.uin()))]
    pub async fn run<S>(&self, frames: S)
    where
        S: Stream<Item = InboundFrame>,
    {
        futures::pin_mut!(frames);
        loop {
            tokio::select! {
                biased;
                _ = self.ctx.shared.cancel.cancelled() => {
                    debug!("Session cancelled; intake stopped");
                    break;
                }
                next = frames.next() => match next {
                    Some(frame) => self.handle_frame(frame),
                    None => {
                        debug!("Inbound stream ended");
                        break;
                    }
                },
            }
        }
    }

    /// Tear the session down.
    pub async fn shutdown(&self) {
        info!(uin = self.ctx.uin(), "Shutting down session");
        let shared = &self.ctx.shared;
        shared.cancel.cancel();

        // dropping the senders resolves any waiter that raced past the token
        let drained = shared
            .pending
            .lock()
            .map(|mut pending| pending.drain().count())
            .unwrap_or(0);
        if drained > 0 {
            debug!(drained, "Cancelled in-flight requests");
        }

        shared.tracker.close();
        if tokio::time::timeout(shared.config.dispatch.shutdown_timeout, shared.tracker.wait())
            .await
            .is_err()
        {
            warn!("Handlers still running after shutdown timeout");
        }

        shared.state.clear().await;
        shared.metrics.log_summary();
    }
}
