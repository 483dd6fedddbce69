use rosbridge_core::Compression;
use serde::{Deserialize, Serialize};

/// Transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// rosbridge WebSocket URL.
    pub url: String,
    /// Capacity of the outbound frame channel feeding the socket writer.
    pub channel_capacity: usize,
    /// WebSocket handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:9090".to_string(),
            channel_capacity: 256,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Defaults applied to new topic handles.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicSettings {
    /// Compression requested by `subscribe`.
    pub default_compression: Compression,
}
