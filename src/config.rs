// src/config.rs

//! Defines the configuration structures for the X11 display backend.
//!
//! The configuration is a JSON document whose every field is optional.
//! It is read once per process into [`CONFIG`] from the file named by the
//! `X11_DISPLAY_CONFIG` environment variable; when the variable is unset,
//! or the file cannot be used, the defaults apply.

use crate::error::{DisplayError, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "X11_DISPLAY_CONFIG";

/// Process-wide configuration, loaded on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_or_default);

// --- Top-Level Configuration Structure ---

/// Represents the complete configuration for the display backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)] // Apply default values for the entire struct if a field is missing.
pub struct Config {
    /// Which X display to talk to.
    pub display: DisplayConfig,
    /// Mouse and keyboard event queue settings.
    pub input: InputConfig,
    /// Logging defaults for the `display-info` binary.
    pub logging: LoggingConfig,
}

impl Config {
    /// Reads and parses a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DisplayError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Parses a configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| DisplayError::Config(e.to_string()))
    }

    /// Loads the file named by `X11_DISPLAY_CONFIG`, or the defaults.
    ///
    /// A broken file is reported at `warn` level and ignored rather than
    /// aborting: the backend is usable with the defaults.
    pub fn load_or_default() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
            return Config::default();
        };
        match Config::from_path(&path) {
            Ok(config) => {
                info!("Loaded display configuration from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Ignoring display configuration {:?}: {}", path, e);
                Config::default()
            }
        }
    }
}

// --- Display Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// X display name such as ":0". `None` uses the DISPLAY environment variable.
    pub name: Option<String>,
}

// --- Input Configuration ---

/// Bounds for the buffered input event queues.
/// Once a queue is full the oldest event is dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub mouse_event_capacity: usize,
    pub keyboard_event_capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            mouse_event_capacity: 50,
            keyboard_event_capacity: 50,
        }
    }
}

// --- Logging Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set.
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            default_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.input.mouse_event_capacity, 50);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::from_json(
            r#"{ "display": { "name": ":1" }, "input": { "mouse_event_capacity": 8 } }"#,
        )
        .unwrap();
        assert_eq!(config.display.name.as_deref(), Some(":1"));
        assert_eq!(config.input.mouse_event_capacity, 8);
        assert_eq!(config.input.keyboard_event_capacity, 50);
        assert_eq!(config.logging.default_filter, "info");
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = Config::from_json("{ not json").unwrap_err();
        assert!(matches!(err, DisplayError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::from_path("/nonexistent/x11-display.json").unwrap_err();
        assert!(matches!(err, DisplayError::Config(_)));
    }
}
