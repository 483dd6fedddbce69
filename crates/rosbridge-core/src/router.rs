//! Inbound frame handling.
//!
//! Dispatch happens in two stages. The whole object goes out under its `op`.
//! Then `publish` and `service_response` are re-dispatched under the key
//! embedded in the payload: the topic name or the correlation id. That is
//! how one transport carries any number of subscriptions and in-flight calls.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{ErrorReporter, ProtocolError};
use crate::ids::CorrelationId;
use crate::protocol::op;
use crate::registry::{ListenerKey, ListenerRegistry};

/// Decodes raw frames and routes them through a [`ListenerRegistry`].
pub struct MessageRouter {
    registry: Arc<ListenerRegistry>,
    reporter: Arc<dyn ErrorReporter>,
}

impl MessageRouter {
    /// Route into `registry`, reporting problems to `reporter`.
    pub fn new(registry: Arc<ListenerRegistry>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { registry, reporter }
    }

    /// The registry frames are routed into.
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Handle one text frame. Never fails; problems go to the reporter.
    pub fn handle_raw_frame(&self, text: &str) {
        match decode(text) {
            Ok(message) => self.route(&message),
            Err(err) => self.report(&err),
        }
    }

    /// Dispatch an already decoded object.
    pub fn route(&self, message: &Map<String, Value>) {
        let Some(op) = message.get("op").and_then(Value::as_str) else {
            self.report(&ProtocolError::malformed("missing string 'op' field"));
            return;
        };
        let whole = Value::Object(message.clone());
        let _ = self.registry.dispatch(&ListenerKey::op(op), &whole);

        match op {
            op::PUBLISH => self.redispatch_publish(message),
            op::SERVICE_RESPONSE => self.redispatch_service_response(message),
            _ => {}
        }
    }

    fn redispatch_publish(&self, message: &Map<String, Value>) {
        let Some(topic) = message.get("topic").and_then(Value::as_str) else {
            self.report(&ProtocolError::malformed("publish without string 'topic'"));
            return;
        };
        let msg = message.get("msg").cloned().unwrap_or(Value::Null);
        let delivered = self.registry.dispatch(&ListenerKey::topic(topic), &msg);
        if delivered == 0 {
            self.unroutable(op::PUBLISH, topic);
        }
    }

    fn redispatch_service_response(&self, message: &Map<String, Value>) {
        let Some(id) = message.get("id").and_then(Value::as_str) else {
            self.report(&ProtocolError::malformed(
                "service_response without string 'id'",
            ));
            return;
        };
        let values = message.get("values").cloned().unwrap_or(Value::Null);
        let key = ListenerKey::Id(CorrelationId::new(id));
        if self.registry.dispatch(&key, &values) == 0 {
            self.unroutable(op::SERVICE_RESPONSE, id);
        }
    }

    fn unroutable(&self, op: &str, key: &str) {
        debug!(op, key, "no listener for inbound payload, dropping");
        self.reporter.report(&ProtocolError::UnroutableResponse {
            op: op.to_owned(),
            key: key.to_owned(),
        });
    }

    fn report(&self, err: &ProtocolError) {
        warn!(error = %err, "dropping inbound frame");
        self.reporter.report(err);
    }
}

fn decode(text: &str) -> Result<Map<String, Value>, ProtocolError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ProtocolError::malformed(format!(
            "expected JSON object, got {}",
            kind(&other)
        ))),
        Err(e) => Err(ProtocolError::malformed(format!("invalid JSON: {e}"))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
