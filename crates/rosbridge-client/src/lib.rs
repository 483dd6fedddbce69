//! # rosbridge-client
//!
//! rosbridge protocol client over one ordered text-message channel.
//!
//! - [`Connection`]: lifecycle state, outbound sends and inbound routing
//! - [`Topic`], [`Service`], [`Param`]: request handles sharing a connection
//! - [`RosClient`]: handle factory and rosapi discovery
//! - [`websocket`]: `tokio-tungstenite` transport
//!
//! Listeners run on whichever task feeds [`TransportEvent`]s into the
//! connection. For the WebSocket transport that is the socket task, so
//! listeners should not block.

#![deny(unsafe_code)]

pub mod client;
pub mod connection;
pub mod error;
pub mod param;
pub mod service;
pub mod topic;
pub mod transport;
pub mod websocket;

#[cfg(test)]
mod test_support;

pub use client::RosClient;
pub use connection::{Connection, ConnectionStateListener, NoopStateListener};
pub use error::{ClientError, TransportError};
pub use param::Param;
pub use service::Service;
pub use topic::Topic;
pub use transport::{ConnectionState, Transport, TransportEvent};
pub use websocket::WebSocketTransport;

pub use rosbridge_core::{
    Compression, CorrelationId, Listener, ListenerKey, ProtocolError, RosMessage,
};
