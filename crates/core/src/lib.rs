//! Coalesce Core - Keys, options, and configuration for the debounce scheduler
//!
//! This crate provides the runtime-independent pieces:
//! - Collision-free action key normalization
//! - Per-call scheduling options (with shorthand forms)
//! - Scheduler configuration (TOML, validated)

pub mod config;
pub mod error;
pub mod key;
pub mod options;

// Re-export main types for convenience
pub use config::{CoalesceConfig, DebouncerConfig, CONFIG_KEYS};
pub use error::ConfigError;
pub use key::{ActionKey, SubjectKey, DEFAULT_GROUP};
pub use options::{DebounceOptions, ResolvedOptions};
