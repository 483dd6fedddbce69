//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! JSON file only needs the keys it changes.

mod connection;
mod rosapi;

pub use connection::*;
pub use rosapi::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "connection": { "url": "ws://robot.local:9090" },
///   "rosapi": { "servicesField": "topics" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RosbridgeSettings {
    /// Transport settings.
    pub connection: ConnectionSettings,
    /// Topic defaults.
    pub topic: TopicSettings,
    /// Well-known rosapi services and their response fields.
    pub rosapi: RosapiSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let v = serde_json::to_value(RosbridgeSettings::default()).unwrap();
        assert!(v["connection"].get("connectTimeoutMs").is_some());
        assert!(v["rosapi"].get("paramNamesService").is_some());
        assert!(v["topic"].get("defaultCompression").is_some());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: RosbridgeSettings =
            serde_json::from_str(r#"{"logging": {"json": true}}"#).unwrap();
        assert!(s.logging.json);
        assert_eq!(s.logging.level, "warn");
        assert_eq!(s.connection.channel_capacity, 256);
    }
}
