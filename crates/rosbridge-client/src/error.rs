//! Client-side error types.

use rosbridge_core::CorrelationId;
use thiserror::Error;

use crate::transport::ConnectionState;

/// Failures of the underlying message channel.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not establish the connection.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Target URL.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// The outbound queue is full.
    #[error("outbound queue full")]
    Backpressure,

    /// The channel is closed.
    #[error("transport closed")]
    Closed,

    /// The transport reported an error event.
    #[error("transport error: {0}")]
    Failed(String),
}

/// Errors returned to callers of the request methods.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `send` was called while the connection was not open.
    #[error("connection is not open (state: {state})")]
    NotOpen {
        /// State at the time of the call.
        state: ConnectionState,
    },

    /// The transport refused the frame.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The outbound message could not be serialized.
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No response arrived in time.
    #[error("timed out after {timeout_ms}ms: {context}")]
    Timeout {
        /// How long we waited.
        timeout_ms: u64,
        /// What we were waiting for.
        context: String,
    },

    /// The one-shot listener was removed before a response arrived.
    #[error("response for {id} was dropped")]
    ResponseDropped {
        /// Correlation id of the abandoned call.
        id: CorrelationId,
    },
}

impl ClientError {
    pub(crate) fn timeout(timeout: std::time::Duration, context: impl Into<String>) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            context: context.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_open_display() {
        let err = ClientError::NotOpen {
            state: ConnectionState::Connecting,
        };
        assert_eq!(err.to_string(), "connection is not open (state: connecting)");
    }

    #[test]
    fn transport_error_is_transparent() {
        let err: ClientError = TransportError::Closed.into();
        assert_eq!(err.to_string(), "transport closed");
    }

    #[test]
    fn timeout_display() {
        let err = ClientError::timeout(std::time::Duration::from_millis(1500), "call /add");
        assert_eq!(err.to_string(), "timed out after 1500ms: call /add");
    }

    #[test]
    fn connect_display() {
        let err = TransportError::Connect {
            url: "ws://robot:9090".into(),
            reason: "refused".into(),
        };
        assert!(err.to_string().contains("ws://robot:9090"));
        assert!(err.to_string().contains("refused"));
    }
}
