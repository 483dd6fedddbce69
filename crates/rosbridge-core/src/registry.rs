//! Listener registry: an ordered multimap from [`ListenerKey`] to callbacks.
//!
//! Dispatch takes a snapshot of the key's list under the lock and invokes the
//! listeners with the lock released, so a listener may add or remove
//! listeners (or send requests) without deadlocking or disturbing the loop.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{error, trace};

use crate::errors::{ErrorReporter, NoopReporter, ProtocolError};
use crate::ids::CorrelationId;

type ListenerFn = dyn Fn(&Value) + Send + Sync;

/// Cloneable callback handle. Two handles are equal when they share the same
/// allocation, so keep the handle around to remove the listener later.
#[derive(Clone)]
pub struct Listener(Arc<ListenerFn>);

impl Listener {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the callback.
    pub fn call(&self, payload: &Value) {
        (self.0)(payload);
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Registry key.
///
/// Ops, topic names and correlation ids live in separate namespaces, and the
/// catch-all list is its own variant, so a topic literally named `"*"` or
/// `"publish"` cannot collide with anything.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListenerKey {
    /// A protocol op such as `"publish"` or `"service_response"`.
    Op(String),
    /// A topic name; receives the `msg` of inbound publishes.
    Topic(String),
    /// A correlation id; receives the `values` of the matching service response.
    Id(CorrelationId),
    /// Receives every payload dispatched under any other key.
    CatchAll,
}

impl ListenerKey {
    /// Key for a protocol op.
    pub fn op(name: impl Into<String>) -> Self {
        Self::Op(name.into())
    }

    /// Key for a topic name.
    pub fn topic(name: impl Into<String>) -> Self {
        Self::Topic(name.into())
    }
}

impl fmt::Display for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Op(op) => write!(f, "op:{op}"),
            Self::Topic(topic) => write!(f, "topic:{topic}"),
            Self::Id(id) => write!(f, "id:{id}"),
            Self::CatchAll => f.write_str("*"),
        }
    }
}

impl From<CorrelationId> for ListenerKey {
    fn from(id: CorrelationId) -> Self {
        Self::Id(id)
    }
}

struct Entry {
    listener: Listener,
    once: bool,
}

/// Op/topic/id-keyed listener lists with catch-all fan-out.
pub struct ListenerRegistry {
    entries: Mutex<HashMap<ListenerKey, Vec<Entry>>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl ListenerRegistry {
    /// Registry whose listener failures are only logged.
    pub fn new() -> Self {
        Self::with_reporter(Arc::new(NoopReporter))
    }

    /// Registry that also reports listener failures to `reporter`.
    pub fn with_reporter(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            reporter,
        }
    }

    /// Append `listener` under `key` unless the same handle is already there.
    ///
    /// Returns `false` for a duplicate.
    pub fn add(&self, key: ListenerKey, listener: Listener) -> bool {
        self.insert(key, listener, false)
    }

    /// Like [`add`](Self::add), but the listener is removed the moment a
    /// dispatch picks it up, so it fires at most once.
    pub fn add_once(&self, key: ListenerKey, listener: Listener) -> bool {
        self.insert(key, listener, true)
    }

    fn insert(&self, key: ListenerKey, listener: Listener, once: bool) -> bool {
        let mut entries = self.entries.lock();
        let list = entries.entry(key).or_default();
        if list.iter().any(|e| e.listener == listener) {
            return false;
        }
        list.push(Entry { listener, once });
        true
    }

    /// Remove one listener. Missing keys and listeners are a no-op.
    ///
    /// The key stays in the map even if its list is now empty.
    pub fn remove(&self, key: &ListenerKey, listener: &Listener) -> bool {
        let mut entries = self.entries.lock();
        let Some(list) = entries.get_mut(key) else {
            return false;
        };
        let before = list.len();
        list.retain(|e| e.listener != *listener);
        list.len() != before
    }

    /// Drop the whole list for `key`.
    pub fn remove_all(&self, key: &ListenerKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Number of listeners registered under `key`.
    pub fn listener_count(&self, key: &ListenerKey) -> usize {
        self.entries.lock().get(key).map_or(0, Vec::len)
    }

    /// Whether `key` has a list, even an empty one.
    pub fn contains_key(&self, key: &ListenerKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Invoke every listener under `key` in registration order, then every
    /// catch-all listener (unless `key` is the catch-all itself).
    ///
    /// Returns how many listeners under `key` were invoked.
    pub fn dispatch(&self, key: &ListenerKey, payload: &Value) -> usize {
        let snapshot = self.snapshot(key);
        for listener in &snapshot {
            self.invoke(key, listener, payload);
        }
        trace!(%key, listeners = snapshot.len(), "dispatched");

        if *key != ListenerKey::CatchAll {
            let _ = self.dispatch(&ListenerKey::CatchAll, payload);
        }
        snapshot.len()
    }

    fn snapshot(&self, key: &ListenerKey) -> Vec<Listener> {
        let mut entries = self.entries.lock();
        let Some(list) = entries.get_mut(key) else {
            return Vec::new();
        };
        let snapshot: Vec<Listener> = list.iter().map(|e| e.listener.clone()).collect();
        if list.iter().any(|e| e.once) {
            list.retain(|e| !e.once);
            if list.is_empty() {
                let _ = entries.remove(key);
            }
        }
        snapshot
    }

    fn invoke(&self, key: &ListenerKey, listener: &Listener, payload: &Value) {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener.call(payload))) {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_owned());
            error!(%key, %message, "listener panicked during dispatch");
            self.reporter.report(&ProtocolError::ListenerFailure {
                key: key.to_string(),
                message,
            });
        }
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("keys", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}
