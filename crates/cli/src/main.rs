//! Coalesce CLI - coalesce command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod script;
mod util;

/// Coalesce - keyed debounce scheduler playground
#[derive(Parser)]
#[command(name = "coalesce")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $COALESCE_CONFIG or <config dir>/coalesce/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a script of timed calls against a scheduler
    Simulate {
        /// Script file (.toml or .json)
        script: PathBuf,
        /// Time to run after the start before exiting (default: last step + longest delay)
        #[arg(long)]
        settle_ms: Option<u64>,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// View or edit scheduler defaults
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value
    Get {
        /// Dotted key, e.g. debounce.default_delay_ms
        key: String,
    },
    /// Set a single value
    Set {
        /// Dotted key, e.g. debounce.default_delay_ms
        key: String,
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Simulate { script, settle_ms, json } => {
            cmd::simulate::run(&script, cli.config, settle_ms, json).await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(cli.config).await,
            ConfigCommands::Get { key } => cmd::config::run_get(cli.config, &key).await,
            ConfigCommands::Set { key, value } => {
                cmd::config::run_set(cli.config, &key, &value).await
            }
        },
    }
}
