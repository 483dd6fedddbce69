//! Request/response calls over a named service.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use rosbridge_core::{CorrelationId, Listener, ListenerKey, OutboundMessage, op};
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::ClientError;

/// Handle to one service.
#[derive(Clone, Debug)]
pub struct Service {
    conn: Connection,
    name: String,
    service_type: Option<String>,
}

impl Service {
    /// Create a handle. Nothing is sent.
    pub fn new(conn: Connection, name: impl Into<String>, service_type: Option<String>) -> Self {
        Self {
            conn,
            name: name.into(),
            service_type,
        }
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service type, if known. Informational only; never sent.
    pub fn service_type(&self) -> Option<&str> {
        self.service_type.as_deref()
    }

    /// Send `call_service` with a fresh id.
    ///
    /// When `listener` is given it is registered one-shot under the id and
    /// receives the response's `values`. A response that never arrives leaves
    /// the registration in place until [`cancel_call`](Self::cancel_call).
    pub fn call_service(
        &self,
        args: Map<String, Value>,
        listener: Option<Listener>,
    ) -> Result<CorrelationId, ClientError> {
        let id = self.conn.next_id(op::CALL_SERVICE, &self.name);
        let key = ListenerKey::Id(id.clone());
        if let Some(listener) = &listener {
            let _ = self.conn.registry().add_once(key.clone(), listener.clone());
        }

        let message = OutboundMessage::CallService {
            id: id.clone(),
            service: self.name.clone(),
            args,
        };
        if let Err(err) = self.conn.send_message(&message) {
            if listener.is_some() {
                let _ = self.conn.remove_all_listeners(&key);
            }
            return Err(err);
        }
        Ok(id)
    }

    /// Forget a pending call. A late response is then unroutable.
    pub fn cancel_call(&self, id: &CorrelationId) -> bool {
        self.conn.remove_all_listeners(&ListenerKey::Id(id.clone()))
    }

    /// Call and wait for the response values, giving up after `timeout`.
    pub async fn call(
        &self,
        args: Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let listener = Listener::new(move |values| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(values.clone());
            }
        });

        let id = self.call_service(args, Some(listener))?;
        debug!(service = %self.name, %id, "awaiting service response");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(values)) => Ok(values),
            Ok(Err(_)) => Err(ClientError::ResponseDropped { id }),
            Err(_) => {
                let _ = self.cancel_call(&id);
                warn!(service = %self.name, %id, timeout_ms = timeout.as_millis(), "service call timed out");
                Err(ClientError::timeout(timeout, format!("call {}", self.name)))
            }
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
