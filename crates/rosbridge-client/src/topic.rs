//! Publish/subscribe over a named topic.

use std::fmt;

use rosbridge_core::{Compression, Listener, ListenerKey, OutboundMessage, RosMessage, op};
use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::ClientError;

/// Handle to one topic.
///
/// Subscribing and advertising are independent. A topic has a single
/// subscription stream from the client's point of view: every listener
/// registered through `subscribe` receives every inbound publish, and
/// `unsubscribe` removes them all.
#[derive(Clone, Debug)]
pub struct Topic {
    conn: Connection,
    name: String,
    message_type: Option<String>,
    advertised: bool,
    compression: Compression,
}

impl Topic {
    /// Create an unadvertised handle.
    pub fn new(conn: Connection, name: impl Into<String>, message_type: Option<String>) -> Self {
        Self {
            conn,
            name: name.into(),
            message_type,
            advertised: false,
            compression: Compression::None,
        }
    }

    /// Topic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the handle. Existing subscriptions stay under the old name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Message type, if known.
    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    /// Set the message type sent with `subscribe` and `advertise`.
    pub fn set_message_type(&mut self, message_type: Option<String>) {
        self.message_type = message_type;
    }

    /// Whether `advertise` has been sent (and not withdrawn).
    pub fn is_advertised(&self) -> bool {
        self.advertised
    }

    /// Compression requested by `subscribe`.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Set the compression requested by subsequent `subscribe` calls.
    pub fn set_compression(&mut self, compression: Compression) {
        self.compression = compression;
    }

    fn key(&self) -> ListenerKey {
        ListenerKey::topic(self.name.clone())
    }

    /// Register `listener` for this topic's messages and send `subscribe`.
    ///
    /// If the send fails the listener is unregistered again.
    pub fn subscribe(&self, listener: Listener) -> Result<(), ClientError> {
        let key = self.key();
        let added = self.conn.add_listener(key.clone(), listener.clone());
        let message = OutboundMessage::Subscribe {
            id: self.conn.next_id(op::SUBSCRIBE, &self.name),
            topic: self.name.clone(),
            msg_type: self.message_type.clone(),
            compression: self.compression,
        };
        if let Err(err) = self.conn.send_message(&message) {
            if added {
                let _ = self.conn.remove_listener(&key, &listener);
            }
            return Err(err);
        }
        Ok(())
    }

    /// Subscribe with a typed callback. Messages that do not parse as `M`
    /// are logged and skipped.
    pub fn subscribe_message<M, F>(&self, callback: F) -> Result<Listener, ClientError>
    where
        M: RosMessage + Default,
        F: Fn(M) + Send + Sync + 'static,
    {
        let topic = self.name.clone();
        let listener = Listener::new(move |value| {
            let mut message = M::default();
            if message.parse(value) {
                callback(message);
            } else {
                warn!(%topic, expected = %message.full_type_name(), "message does not match type, skipping");
            }
        });
        self.subscribe(listener.clone())?;
        Ok(listener)
    }

    /// Drop every listener for this topic and send `unsubscribe`.
    pub fn unsubscribe(&self) -> Result<(), ClientError> {
        let _ = self.conn.remove_all_listeners(&self.key());
        self.conn.send_message(&OutboundMessage::Unsubscribe {
            id: self.conn.next_id(op::UNSUBSCRIBE, &self.name),
            topic: self.name.clone(),
        })
    }

    /// Announce that this client publishes on the topic.
    pub fn advertise(&mut self) -> Result<(), ClientError> {
        self.conn.send_message(&OutboundMessage::Advertise {
            id: self.conn.next_id(op::ADVERTISE, &self.name),
            topic: self.name.clone(),
            msg_type: self.message_type.clone(),
        })?;
        self.advertised = true;
        Ok(())
    }

    /// Withdraw the advertisement.
    pub fn unadvertise(&mut self) -> Result<(), ClientError> {
        self.conn.send_message(&OutboundMessage::Unadvertise {
            id: self.conn.next_id(op::UNADVERTISE, &self.name),
            topic: self.name.clone(),
        })?;
        self.advertised = false;
        Ok(())
    }

    /// Publish `message`, advertising first if needed.
    ///
    /// Success means the frame was handed to the transport; nothing is
    /// acknowledged.
    pub fn publish(&mut self, message: Value) -> Result<(), ClientError> {
        if !self.advertised {
            debug!(topic = %self.name, "auto-advertising before first publish");
            self.advertise()?;
        }
        self.conn.send_message(&OutboundMessage::Publish {
            id: self.conn.next_id(op::PUBLISH, &self.name),
            topic: self.name.clone(),
            msg: message,
        })
    }

    /// Publish a typed message.
    pub fn publish_message<M: RosMessage>(&mut self, message: &M) -> Result<(), ClientError> {
        self.publish(message.to_json())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
