//! rosbridge wire messages.
//!
//! One JSON object per text frame, discriminated by `op`. Outbound messages
//! are typed; inbound ones stay as [`serde_json::Value`] because the router
//! only needs a handful of fields from them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::CorrelationId;

/// Op names used on the wire.
pub mod op {
    /// Client subscribes to a topic.
    pub const SUBSCRIBE: &str = "subscribe";
    /// Client drops its subscription.
    pub const UNSUBSCRIBE: &str = "unsubscribe";
    /// Client announces it will publish on a topic.
    pub const ADVERTISE: &str = "advertise";
    /// Client withdraws an advertisement.
    pub const UNADVERTISE: &str = "unadvertise";
    /// A message on a topic (both directions).
    pub const PUBLISH: &str = "publish";
    /// Client invokes a service.
    pub const CALL_SERVICE: &str = "call_service";
    /// Server answers a `call_service`.
    pub const SERVICE_RESPONSE: &str = "service_response";
    /// PNG-compressed frame. Not decoded by this client.
    pub const PNG: &str = "png";
}

/// Compression requested for a subscription.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Plain JSON messages.
    #[default]
    None,
    /// Server wraps messages in `op: "png"` frames. This client does not
    /// decode them; they reach only listeners registered for the `png` op.
    Png,
}

impl Compression {
    /// Wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "png" => Ok(Self::Png),
            other => Err(format!("unknown compression '{other}'")),
        }
    }
}

/// Client→server protocol message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Start receiving publishes for `topic`.
    Subscribe {
        /// Correlation id.
        id: CorrelationId,
        /// Topic name.
        topic: String,
        /// Message type, `null` when unknown.
        #[serde(rename = "type")]
        msg_type: Option<String>,
        /// Requested compression.
        compression: Compression,
    },
    /// Stop receiving publishes for `topic`.
    Unsubscribe {
        /// Correlation id.
        id: CorrelationId,
        /// Topic name.
        topic: String,
    },
    /// Announce publishing on `topic`.
    Advertise {
        /// Correlation id.
        id: CorrelationId,
        /// Topic name.
        topic: String,
        /// Message type, `null` when unknown.
        #[serde(rename = "type")]
        msg_type: Option<String>,
    },
    /// Withdraw an advertisement.
    Unadvertise {
        /// Correlation id.
        id: CorrelationId,
        /// Topic name.
        topic: String,
    },
    /// Publish `msg` on `topic`.
    Publish {
        /// Correlation id.
        id: CorrelationId,
        /// Topic name.
        topic: String,
        /// Message payload.
        msg: Value,
    },
    /// Invoke `service` with `args`.
    CallService {
        /// Correlation id; echoed back in the `service_response`.
        id: CorrelationId,
        /// Service name.
        service: String,
        /// Call arguments.
        args: Map<String, Value>,
    },
}

impl OutboundMessage {
    /// The `op` this message serializes with.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => op::SUBSCRIBE,
            Self::Unsubscribe { .. } => op::UNSUBSCRIBE,
            Self::Advertise { .. } => op::ADVERTISE,
            Self::Unadvertise { .. } => op::UNADVERTISE,
            Self::Publish { .. } => op::PUBLISH,
            Self::CallService { .. } => op::CALL_SERVICE,
        }
    }

    /// Correlation id carried by the message.
    pub fn id(&self) -> &CorrelationId {
        match self {
            Self::Subscribe { id, .. }
            | Self::Unsubscribe { id, .. }
            | Self::Advertise { id, .. }
            | Self::Unadvertise { id, .. }
            | Self::Publish { id, .. }
            | Self::CallService { id, .. } => id,
        }
    }

    /// Serialize into a JSON object.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> CorrelationId {
        CorrelationId::new(s)
    }

    #[test]
    fn subscribe_wire_shape() {
        let msg = OutboundMessage::Subscribe {
            id: id("subscribe:/chatter:1"),
            topic: "/chatter".into(),
            msg_type: Some("std_msgs/String".into()),
            compression: Compression::None,
        };
        assert_eq!(
            msg.to_value().unwrap(),
            json!({
                "op": "subscribe",
                "id": "subscribe:/chatter:1",
                "topic": "/chatter",
                "type": "std_msgs/String",
                "compression": "none",
            })
        );
    }

    #[test]
    fn advertise_without_type_sends_null() {
        let msg = OutboundMessage::Advertise {
            id: id("advertise:/x:2"),
            topic: "/x".into(),
            msg_type: None,
        };
        let v = msg.to_value().unwrap();
        assert_eq!(v["op"], "advertise");
        assert!(v["type"].is_null());
    }

    #[test]
    fn call_service_wire_shape() {
        let mut args = Map::new();
        let _ = args.insert("name".into(), json!("/rate"));
        let msg = OutboundMessage::CallService {
            id: id("call_service:/rosapi/get_param:3"),
            service: "/rosapi/get_param".into(),
            args,
        };
        assert_eq!(
            msg.to_value().unwrap(),
            json!({
                "op": "call_service",
                "id": "call_service:/rosapi/get_param:3",
                "service": "/rosapi/get_param",
                "args": {"name": "/rate"},
            })
        );
    }

    #[test]
    fn publish_and_unsubscribe_ops() {
        let publish = OutboundMessage::Publish {
            id: id("publish:/t:4"),
            topic: "/t".into(),
            msg: json!({"data": 1}),
        };
        let unsubscribe = OutboundMessage::Unsubscribe {
            id: id("unsubscribe:/t:5"),
            topic: "/t".into(),
        };
        assert_eq!(publish.to_value().unwrap()["op"], publish.op());
        assert_eq!(unsubscribe.to_value().unwrap()["op"], "unsubscribe");
        assert_eq!(unsubscribe.id().as_str(), "unsubscribe:/t:5");
    }

    #[test]
    fn compression_parse_and_display() {
        assert_eq!("png".parse::<Compression>().unwrap(), Compression::Png);
        assert_eq!(Compression::default().to_string(), "none");
        assert!("cbor".parse::<Compression>().is_err());
    }
}
