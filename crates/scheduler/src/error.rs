//! Scheduler construction errors

use coalesce_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DebouncerError {
    /// Timers need a tokio runtime to run on
    #[error("no tokio runtime available; build the debouncer inside a runtime or pass a handle")]
    NoRuntime,

    #[error("invalid debouncer configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, DebouncerError>;
