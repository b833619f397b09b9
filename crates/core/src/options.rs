//! Per-call scheduling options
//!
//! Options left unset fall back to the scheduler's [`DebouncerConfig`].
//! Besides the full options struct, a few shorthand forms convert into it:
//! - `u64` - delay in milliseconds
//! - `Duration` - delay
//! - `(u64, group)` - delay in milliseconds plus a positional group key
//!
//! [`DebouncerConfig`]: crate::config::DebouncerConfig

use crate::config::DebouncerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for a single `schedule` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceOptions {
    /// Quiet period before the action runs
    #[serde(default, with = "opt_millis", rename = "delay_ms")]
    pub delay: Option<Duration>,

    /// Namespace for eviction and bulk cancellation
    #[serde(default)]
    pub group: Option<String>,

    /// Maximum tracked entries in the group (0 disables eviction)
    #[serde(default)]
    pub max_cache_data: Option<usize>,
}

impl DebounceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_delay_ms(self, delay_ms: u64) -> Self {
        self.with_delay(Duration::from_millis(delay_ms))
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_max_cache_data(mut self, max: usize) -> Self {
        self.max_cache_data = Some(max);
        self
    }

    /// Shorthand form taking a delay and an optional positional group key
    pub fn legacy(delay_ms: u64, group: Option<&str>) -> Self {
        let options = Self::new().with_delay_ms(delay_ms);
        match group {
            Some(group) => options.with_group(group),
            None => options,
        }
    }

    /// Fill unset fields from `config`
    pub fn resolve(&self, config: &DebouncerConfig) -> ResolvedOptions {
        ResolvedOptions {
            delay: self.delay.unwrap_or_else(|| config.default_delay()),
            group: self
                .group
                .clone()
                .unwrap_or_else(|| config.default_group.clone()),
            max_cache_data: self.max_cache_data.unwrap_or(config.default_max_cache_data),
        }
    }
}

impl From<u64> for DebounceOptions {
    fn from(delay_ms: u64) -> Self {
        Self::legacy(delay_ms, None)
    }
}

impl From<Duration> for DebounceOptions {
    fn from(delay: Duration) -> Self {
        Self::new().with_delay(delay)
    }
}

impl From<(u64, &str)> for DebounceOptions {
    fn from((delay_ms, group): (u64, &str)) -> Self {
        Self::legacy(delay_ms, Some(group))
    }
}

impl From<(u64, String)> for DebounceOptions {
    fn from((delay_ms, group): (u64, String)) -> Self {
        Self::new().with_delay_ms(delay_ms).with_group(group)
    }
}

impl From<()> for DebounceOptions {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

/// Options with every field filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub delay: Duration,
    pub group: String,
    /// 0 disables eviction
    pub max_cache_data: usize,
}

impl ResolvedOptions {
    /// Eviction cap, if eviction is enabled
    pub fn cap(&self) -> Option<usize> {
        (self.max_cache_data > 0).then_some(self.max_cache_data)
    }
}

mod opt_millis {
    use serde::{ser::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => {
                let millis = u64::try_from(d.as_millis())
                    .map_err(|_| S::Error::custom("delay does not fit in u64 milliseconds"))?;
                s.serialize_some(&millis)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_come_from_config() {
        let config = DebouncerConfig::default();
        let resolved = DebounceOptions::default().resolve(&config);

        assert_eq!(resolved.delay, Duration::from_millis(500));
        assert_eq!(resolved.group, "default");
        assert_eq!(resolved.max_cache_data, 10);
        assert_eq!(resolved.cap(), Some(10));
    }

    #[test]
    fn test_explicit_fields_win() {
        let config = DebouncerConfig::default();
        let resolved = DebounceOptions::new()
            .with_delay_ms(100)
            .with_group("likes")
            .with_max_cache_data(0)
            .resolve(&config);

        assert_eq!(resolved.delay, Duration::from_millis(100));
        assert_eq!(resolved.group, "likes");
        assert_eq!(resolved.cap(), None);
    }

    #[test]
    fn test_legacy_forms_match_full_options() {
        let full = DebounceOptions::new().with_delay_ms(300).with_group("grp");

        assert_eq!(DebounceOptions::from((300u64, "grp")), full);
        assert_eq!(DebounceOptions::from((300u64, "grp".to_string())), full);
        assert_eq!(DebounceOptions::legacy(300, Some("grp")), full);
        assert_eq!(
            DebounceOptions::from(300u64),
            DebounceOptions::new().with_delay_ms(300)
        );
        assert_eq!(
            DebounceOptions::from(Duration::from_millis(300)),
            DebounceOptions::new().with_delay_ms(300)
        );
    }

    #[test]
    fn test_serde_uses_millis() {
        let options: DebounceOptions =
            serde_json::from_str(r#"{"delay_ms": 250, "group": "likes"}"#).unwrap();
        assert_eq!(options, DebounceOptions::new().with_delay_ms(250).with_group("likes"));

        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["delay_ms"], 250);
        assert!(json["max_cache_data"].is_null());

        let huge = DebounceOptions::new().with_delay(Duration::MAX);
        assert!(serde_json::to_string(&huge).is_err());
    }

    #[test]
    fn test_custom_config_defaults() {
        let config = DebouncerConfig {
            default_delay_ms: 50,
            default_group: "ui".to_string(),
            default_max_cache_data: 3,
        };
        let resolved = DebounceOptions::from(()).resolve(&config);

        assert_eq!(resolved.delay, Duration::from_millis(50));
        assert_eq!(resolved.group, "ui");
        assert_eq!(resolved.max_cache_data, 3);
    }
}
