//! Configuration for snapview
//!
//! [`CoreConfig`] is stored as TOML. Missing keys fall back to their
//! defaults, and a default file is written the first time a config is
//! loaded from a path that does not exist.
//!
//! # Example
//!
//! ```ignore
//! use snapview_core::config::{config_path, CoreConfig};
//!
//! let config = CoreConfig::load_from(config_path())?;
//! snapview_core::logging::init(&config);
//! ```

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::AttributeConflict;

pub use loader::{config_path, CONFIG_ENV, DEFAULT_CONFIG_FILE};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Force debug logging
    pub debug: bool,

    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,

    /// How custom operations resolve parameters their action also defines
    pub attribute_conflict: AttributeConflict,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            log_filter: "info".to_string(),
            attribute_conflict: AttributeConflict::default(),
        }
    }
}

impl CoreConfig {
    /// Load from [`config_path`], creating a default file if missing.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path`, creating a default file if missing.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::debug!("Loaded core config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save_to(path)?;
            tracing::info!("Created default core config at {:?}", path);
            Ok(default)
        }
    }

    /// Parse TOML, filling missing keys with defaults.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save to `path`.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved core config to {:?}", path);
        Ok(())
    }

    /// Reload from `path`, replacing every field.
    pub fn reload_from(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        *self = Self::from_toml_str(&content)?;
        tracing::debug!("Reloaded core config from {:?}", path);
        Ok(())
    }
}
