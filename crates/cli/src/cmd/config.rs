//! Configuration management command
//!
//! Provides CLI interface to view and edit scheduler defaults.

use crate::util;
use anyhow::{Context, Result};
use coalesce_core::config::{MAX_CACHE_DATA, MAX_DELAY_MS};
use coalesce_core::{CoalesceConfig, CONFIG_KEYS};
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// List all configuration values
pub async fn run_list(config_path: Option<PathBuf>) -> Result<()> {
    let config_path = util::config_path(config_path)?;
    let config = CoalesceConfig::load(&config_path)?;

    println!("{}", "Scheduler Configuration".bold());
    println!(
        "{}: {}{}\n",
        "Location".dimmed(),
        config_path.display().dimmed(),
        if config_path.exists() { "" } else { " (not created, showing defaults)" }
    );

    println!("{}", "[debounce]".yellow());
    for key in CONFIG_KEYS {
        let field = key.trim_start_matches("debounce.");
        println!("  {} = {}", field.cyan(), config.get(key)?);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  default_delay_ms: 0-{}", MAX_DELAY_MS);
    println!("  default_group: any non-empty string");
    println!("  default_max_cache_data: 0-{} (0 = no eviction)", MAX_CACHE_DATA);

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(config_path: Option<PathBuf>, key: &str) -> Result<()> {
    let config_path = util::config_path(config_path)?;
    let config = CoalesceConfig::load(&config_path)?;

    let value = config
        .get(key)
        .context("Use 'coalesce config list' to see available keys")?;

    println!("{}", value);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(config_path: Option<PathBuf>, key: &str, value: &str) -> Result<()> {
    let config_path = util::config_path(config_path)?;
    let mut config = CoalesceConfig::load(&config_path)?;

    config
        .set(key, value)
        .context("Invalid configuration value")?;
    config
        .save(&config_path)
        .with_context(|| format!("Failed to save config to {}", config_path.display()))?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}
