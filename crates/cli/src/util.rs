//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "COALESCE_CONFIG";

/// Resolve the config file path
///
/// Precedence: explicit `--config`, then `$COALESCE_CONFIG`, then
/// `<config dir>/coalesce/config.toml`.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(dir.join("coalesce").join("config.toml"))
}
