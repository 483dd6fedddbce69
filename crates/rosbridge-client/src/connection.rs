//! Connection: owns the transport, tracks its state, and routes inbound frames.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rosbridge_core::{
    CorrelationId, ErrorReporter, IdGenerator, Listener, ListenerKey, ListenerRegistry,
    MessageRouter, OutboundMessage, ProtocolError,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ClientError, TransportError};
use crate::transport::{ConnectionState, Transport, TransportEvent};

/// Receives connection lifecycle notifications and inbound protocol errors.
///
/// All methods run on whichever task feeds transport events into the
/// connection. Every method defaults to doing nothing.
pub trait ConnectionStateListener: Send + Sync {
    /// The transport opened.
    fn on_open(&self) {}

    /// The transport failed.
    fn on_error(&self, _error: &TransportError) {}

    /// The transport closed. Called at most once.
    fn on_close(&self) {}

    /// An inbound frame could not be handled. Already logged.
    fn on_protocol_error(&self, _error: &ProtocolError) {}
}

/// Listener that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStateListener;

impl ConnectionStateListener for NoopStateListener {}

struct StateReporter(Arc<dyn ConnectionStateListener>);

impl ErrorReporter for StateReporter {
    fn report(&self, error: &ProtocolError) {
        self.0.on_protocol_error(error);
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    state: Mutex<ConnectionState>,
    close_notified: AtomicBool,
    ids: IdGenerator,
    router: MessageRouter,
    listener: Arc<dyn ConnectionStateListener>,
}

/// One rosbridge session over one transport.
///
/// Cheap to clone; clones share the transport, the listener registry and the
/// id counter. Neither is ever shared with another connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Wrap a transport that has not opened yet.
    pub fn new(transport: Arc<dyn Transport>, listener: Arc<dyn ConnectionStateListener>) -> Self {
        let reporter: Arc<dyn ErrorReporter> = Arc::new(StateReporter(Arc::clone(&listener)));
        let registry = Arc::new(ListenerRegistry::with_reporter(Arc::clone(&reporter)));
        Self {
            inner: Arc::new(Inner {
                transport,
                state: Mutex::new(ConnectionState::Connecting),
                close_notified: AtomicBool::new(false),
                ids: IdGenerator::new(),
                router: MessageRouter::new(registry, reporter),
                listener,
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// Whether `send` will be attempted.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Feed one transport event into the connection.
    pub fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.on_transport_open(),
            TransportEvent::Message(text) => {
                if self.is_open() {
                    self.inner.router.handle_raw_frame(&text);
                } else {
                    warn!(state = %self.state(), "frame received on a connection that is not open, dropping");
                }
            }
            TransportEvent::Error(reason) => self.on_transport_error(reason),
            TransportEvent::Close => self.on_transport_close(),
        }
    }

    fn on_transport_open(&self) {
        {
            let mut state = self.inner.state.lock();
            let current = *state;
            if current != ConnectionState::Connecting {
                warn!(state = %current, "ignoring open event");
                return;
            }
            *state = ConnectionState::Open;
        }
        info!("rosbridge connection open");
        self.inner.listener.on_open();
    }

    fn on_transport_error(&self, reason: String) {
        {
            let mut state = self.inner.state.lock();
            let current = *state;
            if current.is_terminal() {
                debug!(%reason, state = %current, "transport error on finished connection, ignoring");
                return;
            }
            *state = ConnectionState::Errored;
        }
        warn!(%reason, "rosbridge transport error");
        self.inner.listener.on_error(&TransportError::Failed(reason));
    }

    fn on_transport_close(&self) {
        self.mark_closed();
        if !self.inner.close_notified.swap(true, Ordering::AcqRel) {
            info!("rosbridge connection closed");
            self.inner.listener.on_close();
        }
    }

    fn mark_closed(&self) {
        let mut state = self.inner.state.lock();
        if *state != ConnectionState::Errored {
            *state = ConnectionState::Closed;
        }
    }

    /// Serialize `message` (a JSON object) and hand it to the transport.
    ///
    /// The connection must be open; nothing is queued otherwise.
    pub fn send(&self, message: &Value) -> Result<(), ClientError> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(ClientError::NotOpen { state });
        }
        let text = serde_json::to_string(message)?;
        self.inner.transport.send(text)?;
        Ok(())
    }

    /// Send a typed protocol message.
    pub fn send_message(&self, message: &OutboundMessage) -> Result<(), ClientError> {
        debug!(op = message.op(), id = %message.id(), "sending");
        self.send(&message.to_value()?)
    }

    /// Close the transport. No request can be sent afterwards.
    pub fn close(&self) {
        self.mark_closed();
        self.inner.transport.close();
    }

    /// Issue a fresh correlation id.
    pub fn next_id(&self, kind: &str, subject: &str) -> CorrelationId {
        self.inner.ids.generate(kind, subject)
    }

    /// The listener registry inbound frames are dispatched through.
    pub fn registry(&self) -> &ListenerRegistry {
        self.inner.router.registry()
    }

    /// Register a durable listener under `key`. Duplicates are ignored.
    pub fn add_listener(&self, key: ListenerKey, listener: Listener) -> bool {
        self.registry().add(key, listener)
    }

    /// Remove one listener from `key`.
    pub fn remove_listener(&self, key: &ListenerKey, listener: &Listener) -> bool {
        self.registry().remove(key, listener)
    }

    /// Remove every listener under `key`.
    pub fn remove_all_listeners(&self, key: &ListenerKey) -> bool {
        self.registry().remove_all(key)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("ids_issued", &self.inner.ids.issued())
            .finish_non_exhaustive()
    }
}
