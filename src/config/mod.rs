//! Engine configuration.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`DIALOG_*`)
//! - Plain struct literals (most callers)

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Default per-wait timeout in milliseconds.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 1000;

/// Engine configuration for one machine instance.
///
/// Every field is optional in serialized form; omitted fields take the
/// values from [`EngineConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout applied to waits that do not specify their own, in
    /// milliseconds.
    pub wait_timeout_ms: u64,

    /// Optional machine name, attached to log records alongside the
    /// generated machine ID.
    pub name: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            name: None,
        }
    }
}

impl EngineConfig {
    /// Default wait timeout as a `Duration`.
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ms) = std::env::var("DIALOG_WAIT_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.wait_timeout_ms = ms;
            }
        }
        if let Ok(name) = std::env::var("DIALOG_MACHINE_NAME") {
            config.name = Some(name);
        }

        config
    }
}
