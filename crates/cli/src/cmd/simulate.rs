//! Replay a script of timed calls against a live scheduler
//!
//! Prints every state change and every action that runs, then the final
//! counters. With `--json` the same data is emitted as one JSON document.

use crate::script::{Op, Script};
use crate::util;
use anyhow::{Context, Result};
use coalesce_core::CoalesceConfig;
use coalesce_scheduler::{ChangeCause, ChannelObserver, Debouncer, DebouncerStats, StateChange};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
struct ChangeRecord {
    at_ms: u64,
    key: String,
    cause: &'static str,
    debouncing: bool,
}

#[derive(Debug, Clone, Serialize)]
struct FiredRecord {
    at_ms: u64,
    label: String,
}

/// Everything the printer sees, in the order it happened
enum Event {
    Change(StateChange),
    Ran(FiredRecord),
}

impl From<StateChange> for Event {
    fn from(change: StateChange) -> Self {
        Event::Change(change)
    }
}

#[derive(Debug, Serialize)]
struct Report {
    changes: Vec<ChangeRecord>,
    fired: Vec<FiredRecord>,
    stats: DebouncerStats,
}

pub async fn run(
    script_path: &Path,
    config_path: Option<PathBuf>,
    settle_ms: Option<u64>,
    json: bool,
) -> Result<()> {
    let config_path = util::config_path(config_path)?;
    let config = CoalesceConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let script = Script::load(script_path)?;

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let debouncer = Debouncer::builder()
        .config(config.debounce.clone())
        .observer(ChannelObserver::from_sender(tx.clone()))
        .build()
        .context("Failed to build debouncer")?;

    let start = Instant::now();
    let printer = tokio::spawn(print_events(rx, start, json));

    if !json {
        println!(
            "{} {} ({} steps)",
            "Replaying".bold(),
            script_path.display(),
            script.steps.len()
        );
    }

    for (index, step) in script.steps.iter().enumerate() {
        sleep_until(start + Duration::from_millis(step.at_ms)).await;
        debug!("Step {}: {:?}", index, step.op);

        match step.op {
            Op::Schedule => {
                let Some(key) = step.key.clone() else { continue };
                let label = step.label(index);
                let tx = tx.clone();
                debouncer.schedule(
                    key,
                    move || {
                        let at_ms = elapsed_ms(start);
                        // The printer outlives every sender
                        let _ = tx.send(Event::Ran(FiredRecord { at_ms, label }));
                    },
                    step.options(),
                );
            }
            Op::Cancel => {
                if let Some(key) = step.key.clone() {
                    debouncer.cancel(key, step.options.group.as_deref());
                }
            }
            Op::Flush => {
                if let Some(key) = step.key.clone() {
                    debouncer.flush(key, step.options.group.as_deref());
                }
            }
            Op::CancelGroup => {
                if let Some(group) = &step.options.group {
                    debouncer.cancel_by_group(group);
                }
            }
            Op::CancelAll => {
                debouncer.cancel_all();
            }
        }
    }

    let horizon = settle_ms.unwrap_or_else(|| script.horizon_ms(config.debounce.default_delay_ms));
    sleep_until(start + Duration::from_millis(horizon) + Duration::from_millis(10)).await;

    let stats = debouncer.stats();
    // Dropping the scheduler and the last sender closes the channel and ends the printer
    drop(debouncer);
    drop(tx);
    let (changes, fired) = printer.await.context("Event printer task failed")?;

    if json {
        let report = Report { changes, fired, stats };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_stats(&stats);
    }

    Ok(())
}

async fn print_events(
    mut rx: mpsc::UnboundedReceiver<Event>,
    start: Instant,
    quiet: bool,
) -> (Vec<ChangeRecord>, Vec<FiredRecord>) {
    let mut changes = Vec::new();
    let mut fired = Vec::new();

    while let Some(event) = rx.recv().await {
        match event {
            Event::Change(change) => {
                let at_ms = elapsed_ms(start);
                if !quiet {
                    let cause = change.cause.as_str();
                    let cause = match change.cause {
                        ChangeCause::Scheduled => cause.cyan().to_string(),
                        ChangeCause::Fired | ChangeCause::Flushed => cause.green().to_string(),
                        ChangeCause::Cancelled => cause.yellow().to_string(),
                        ChangeCause::Evicted => cause.red().to_string(),
                    };
                    println!("{} {:<10} {}", stamp(at_ms), cause, change.key);
                }

                changes.push(ChangeRecord {
                    at_ms,
                    key: change.key.to_string(),
                    cause: change.cause.as_str(),
                    debouncing: change.debouncing,
                });
            }
            Event::Ran(record) => {
                if !quiet {
                    println!("{} {} {}", stamp(record.at_ms), "ran".green().bold(), record.label);
                }
                fired.push(record);
            }
        }
    }

    (changes, fired)
}

fn print_stats(stats: &DebouncerStats) {
    println!("\n{}", "Summary".bold());
    println!("  {}: {}", "scheduled".cyan(), stats.scheduled);
    println!("  {}: {}", "replaced".cyan(), stats.replaced);
    println!("  {}: {}", "fired".cyan(), stats.fired);
    println!("  {}: {}", "flushed".cyan(), stats.flushed);
    println!("  {}: {}", "cancelled".cyan(), stats.cancelled);
    println!("  {}: {}", "evicted".cyan(), stats.evicted);
    if stats.tracked > 0 {
        println!(
            "  {}",
            format!("{} entries still pending at exit", stats.tracked).dimmed()
        );
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn stamp(at_ms: u64) -> String {
    format!("[+{:>5}ms]", at_ms).dimmed().to_string()
}
