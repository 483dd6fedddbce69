//! # rosbridge-settings
//!
//! Configuration for the rosbridge client, loaded in three layers (lowest
//! priority first):
//! 1. **Compiled defaults**: [`RosbridgeSettings::default()`]
//! 2. **User file**: `~/.rosbridge/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `ROSBRIDGE_*` overrides
//!
//! # Usage
//!
//! ```no_run
//! use rosbridge_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("rosbridge url: {}", settings.connection.url);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<RosbridgeSettings> = OnceLock::new();

/// Global settings, loaded on first access.
///
/// Falls back to compiled defaults if the file cannot be loaded.
pub fn get_settings() -> &'static RosbridgeSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            RosbridgeSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Hands the value back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: RosbridgeSettings) -> std::result::Result<(), RosbridgeSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = RosbridgeSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = RosbridgeSettings::default();
        assert_eq!(settings.connection.url, "ws://localhost:9090");
        assert_eq!(settings.rosapi.topics_service, "/rosapi/topics");
        assert_eq!(settings.rosapi.services_field, "services");
        assert_eq!(settings.logging.level, "warn");
    }
}
