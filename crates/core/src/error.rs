//! Error types for configuration handling

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, validating, or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
