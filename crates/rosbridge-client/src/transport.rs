//! Boundary between the protocol core and the message channel.
//!
//! A transport moves text frames out. Inbound activity is pushed into the
//! [`Connection`](crate::Connection) as [`TransportEvent`]s by whoever drives
//! the transport.

use std::fmt;

use crate::error::TransportError;

/// Outbound half of a bidirectional, ordered text-message channel.
pub trait Transport: Send + Sync {
    /// Hand one text frame to the channel. Must not block.
    fn send(&self, text: String) -> Result<(), TransportError>;

    /// Begin closing the channel. A `Close` event follows once it is closed.
    fn close(&self);
}

/// Inbound activity reported by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The channel is ready for traffic.
    Open,
    /// One inbound text frame.
    Message(String),
    /// The channel failed.
    Error(String),
    /// The channel is closed.
    Close,
}

/// Lifecycle of a connection. Closed and Errored are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the transport to open.
    Connecting,
    /// Traffic may flow.
    Open,
    /// Closed by either side.
    Closed,
    /// The transport reported an error.
    Errored,
}

impl ConnectionState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        })
    }
}
