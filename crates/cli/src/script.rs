//! Replay scripts for `coalesce simulate`
//!
//! A script is a list of timed steps, in TOML or JSON:
//! ```toml
//! [[step]]
//! at_ms = 0
//! op = "schedule"
//! key = 42
//! group = "likes"
//! delay_ms = 300
//! label = "like post 42"
//!
//! [[step]]
//! at_ms = 120
//! op = "flush"
//! key = 42
//! group = "likes"
//! ```

use anyhow::{Context, Result};
use coalesce_core::{DebounceOptions, SubjectKey};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(rename = "step", alias = "steps", default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Schedule,
    Cancel,
    Flush,
    CancelGroup,
    CancelAll,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Offset from the start of the replay
    pub at_ms: u64,
    pub op: Op,
    pub key: Option<SubjectKey>,
    /// Printed when a scheduled action runs
    pub label: Option<String>,
    /// `delay_ms`, `group` and `max_cache_data`
    #[serde(flatten)]
    pub options: DebounceOptions,
}

impl Step {
    pub fn options(&self) -> DebounceOptions {
        self.options.clone()
    }

    pub fn label(&self, index: usize) -> String {
        match (&self.label, &self.key) {
            (Some(label), _) => label.clone(),
            (None, Some(key)) => format!("step {} ({})", index, key),
            (None, None) => format!("step {}", index),
        }
    }
}

impl Script {
    /// Load a script, picking the format from the file extension (TOML by default)
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;

        let mut script: Script = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON script {}", path.display()))?,
            _ => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML script {}", path.display()))?,
        };

        script.validate()?;
        script.steps.sort_by_key(|step| step.at_ms);
        Ok(script)
    }

    fn validate(&self) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            match step.op {
                Op::Schedule | Op::Cancel | Op::Flush if step.key.is_none() => {
                    anyhow::bail!("Step {} ({:?}) requires a key", index, step.op);
                }
                Op::CancelGroup if step.options.group.is_none() => {
                    anyhow::bail!("Step {} (cancel_group) requires a group", index);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Time of the last step plus the longest delay any step asks for
    pub fn horizon_ms(&self, default_delay_ms: u64) -> u64 {
        let last = self.steps.iter().map(|s| s.at_ms).max().unwrap_or(0);
        let longest = self
            .steps
            .iter()
            .filter(|s| s.op == Op::Schedule)
            .map(|s| {
                s.options
                    .delay
                    .map_or(default_delay_ms, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            })
            .max()
            .unwrap_or(0);
        last.saturating_add(longest)
    }
}
