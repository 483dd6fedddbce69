//! Errors raised on the inbound path.
//!
//! Inbound frames arrive on the transport reader, which has no caller to
//! return an error to. These errors are terminal at the router/registry
//! boundary: they are logged and handed to an [`ErrorReporter`].

use thiserror::Error;

/// Protocol-level failure observed while handling an inbound frame.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is not JSON, not an object, or lacks a string `op`.
    #[error("malformed frame: {reason}")]
    MalformedFrame {
        /// What was wrong with the frame.
        reason: String,
    },

    /// A `publish` or `service_response` whose correlation key has no listener.
    #[error("unroutable {op} for '{key}'")]
    UnroutableResponse {
        /// The op that carried the payload.
        op: String,
        /// Topic name or correlation id that matched nothing.
        key: String,
    },

    /// A listener panicked during dispatch.
    #[error("listener for '{key}' failed: {message}")]
    ListenerFailure {
        /// Registry key the listener was registered under.
        key: String,
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }
}

/// Side channel for [`ProtocolError`]s.
pub trait ErrorReporter: Send + Sync {
    /// Called once per error, on the thread that handled the frame.
    fn report(&self, error: &ProtocolError);
}

/// Reporter that drops everything. Errors are still logged by the router.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _error: &ProtocolError) {}
}

impl<F> ErrorReporter for F
where
    F: Fn(&ProtocolError) + Send + Sync,
{
    fn report(&self, error: &ProtocolError) {
        self(error);
    }
}
