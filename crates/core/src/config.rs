//! Scheduler configuration
//!
//! Stored as TOML:
//! ```toml
//! [debounce]
//! default_delay_ms = 500
//! default_group = "default"
//! default_max_cache_data = 10
//! ```
//!
//! A missing file means all defaults. Every field is optional.

use crate::error::{ConfigError, Result};
use crate::key::DEFAULT_GROUP;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Upper bound for `default_delay_ms` (one hour)
pub const MAX_DELAY_MS: u64 = 3_600_000;

/// Upper bound for `default_max_cache_data`
pub const MAX_CACHE_DATA: usize = 1_000_000;

/// Keys accepted by [`CoalesceConfig::get`] and [`CoalesceConfig::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "debounce.default_delay_ms",
    "debounce.default_group",
    "debounce.default_max_cache_data",
];

/// Defaults injected into a scheduler at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebouncerConfig {
    /// Delay used when a call does not set one (default: 500ms)
    pub default_delay_ms: u64,

    /// Group used when a call does not name one (default: "default")
    pub default_group: String,

    /// Per-group entry cap used when a call does not set one (default: 10, 0 = unbounded)
    pub default_max_cache_data: usize,
}

impl Default for DebouncerConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: 500,
            default_group: DEFAULT_GROUP.to_string(),
            default_max_cache_data: 10,
        }
    }
}

impl DebouncerConfig {
    pub fn default_delay(&self) -> Duration {
        Duration::from_millis(self.default_delay_ms)
    }

    /// Check every field against its valid range
    pub fn validate(&self) -> Result<()> {
        if self.default_delay_ms > MAX_DELAY_MS {
            return Err(ConfigError::Invalid {
                field: "default_delay_ms",
                reason: format!("{} exceeds maximum of {}", self.default_delay_ms, MAX_DELAY_MS),
            });
        }

        if self.default_group.is_empty() {
            return Err(ConfigError::Invalid {
                field: "default_group",
                reason: "must not be empty".to_string(),
            });
        }

        if self.default_max_cache_data > MAX_CACHE_DATA {
            return Err(ConfigError::Invalid {
                field: "default_max_cache_data",
                reason: format!(
                    "{} exceeds maximum of {}",
                    self.default_max_cache_data, MAX_CACHE_DATA
                ),
            });
        }

        Ok(())
    }
}

/// On-disk configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoalesceConfig {
    pub debounce: DebouncerConfig,
}

impl CoalesceConfig {
    /// Load configuration from `path`, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.debounce.validate()?;
        Ok(config)
    }

    /// Validate and write configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        self.debounce.validate()?;

        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(io_err)?;
        Ok(())
    }

    /// Read a single value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "debounce.default_delay_ms" => self.debounce.default_delay_ms.to_string(),
            "debounce.default_group" => self.debounce.default_group.clone(),
            "debounce.default_max_cache_data" => self.debounce.default_max_cache_data.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a single value by dotted key
    ///
    /// The new value is validated; on error the config is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut updated = self.debounce.clone();

        match key {
            "debounce.default_delay_ms" => {
                updated.default_delay_ms = value.parse().map_err(|_| ConfigError::Invalid {
                    field: "default_delay_ms",
                    reason: format!("'{}' is not a non-negative integer", value),
                })?;
            }
            "debounce.default_group" => {
                updated.default_group = value.to_string();
            }
            "debounce.default_max_cache_data" => {
                updated.default_max_cache_data =
                    value.parse().map_err(|_| ConfigError::Invalid {
                        field: "default_max_cache_data",
                        reason: format!("'{}' is not a non-negative integer", value),
                    })?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        updated.validate()?;
        self.debounce = updated;
        Ok(())
    }
}
