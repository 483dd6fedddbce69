//! Recording transport and state listener for unit tests.

use std::sync::Arc;

use parking_lot::Mutex;
use rosbridge_core::ProtocolError;
use serde_json::Value;

use crate::connection::{Connection, ConnectionStateListener};
use crate::error::TransportError;
use crate::transport::{Transport, TransportEvent};

/// Keeps every frame handed to it.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    closed: Mutex<bool>,
    refusal: Mutex<Option<TransportError>>,
}

impl RecordingTransport {
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub(crate) fn sent_values(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    pub(crate) fn ops(&self) -> Vec<String> {
        self.sent_values()
            .iter()
            .map(|v| v["op"].as_str().unwrap_or_default().to_owned())
            .collect()
    }

    pub(crate) fn last(&self) -> Value {
        self.sent_values().pop().expect("nothing sent")
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    pub(crate) fn refuse_with(&self, err: TransportError) {
        *self.refusal.lock() = Some(err);
    }
}

impl Transport for RecordingTransport {
    fn send(&self, text: String) -> Result<(), TransportError> {
        if let Some(err) = self.refusal.lock().clone() {
            return Err(err);
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn close(&self) {
        *self.closed.lock() = true;
    }
}

/// Records lifecycle callbacks as short strings.
#[derive(Default)]
pub(crate) struct RecordingListener {
    events: Mutex<Vec<String>>,
    protocol_errors: Mutex<Vec<ProtocolError>>,
}

impl RecordingListener {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub(crate) fn protocol_errors(&self) -> Vec<ProtocolError> {
        self.protocol_errors.lock().clone()
    }
}

impl ConnectionStateListener for RecordingListener {
    fn on_open(&self) {
        self.events.lock().push("open".into());
    }

    fn on_error(&self, error: &TransportError) {
        self.events.lock().push(format!("error:{error}"));
    }

    fn on_close(&self) {
        self.events.lock().push("close".into());
    }

    fn on_protocol_error(&self, error: &ProtocolError) {
        self.protocol_errors.lock().push(error.clone());
    }
}

/// An already open connection over a [`RecordingTransport`].
pub(crate) fn open_connection() -> (Connection, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::default());
    let conn = Connection::new(transport.clone(), Arc::new(RecordingListener::default()));
    conn.handle_event(TransportEvent::Open);
    (conn, transport)
}

/// Deliver a server frame to `conn`.
pub(crate) fn inbound(conn: &Connection, frame: &Value) {
    conn.handle_event(TransportEvent::Message(frame.to_string()));
}
