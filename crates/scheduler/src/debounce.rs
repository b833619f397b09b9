//! Keyed, grouped debouncing
//!
//! Coalesces bursts of calls for the same `(group, key)` into one delayed
//! execution:
//! - Last call wins: rescheduling replaces the pending action and restarts the timer
//! - Per-group capacity: oldest entries are silently dropped past `max_cache_data`
//! - Flush/cancel by key, by group, or globally
//!
//! All state lives behind one lock. Actions and observers always run after
//! the lock is released, so they may call back into the scheduler.

use crate::error::{DebouncerError, Result};
use crate::observer::{ChangeCause, StateChange, StateObserver};
use crate::stats::{Counters, DebouncerStats};
use ahash::AHashMap;
use coalesce_core::{ActionKey, DebounceOptions, DebouncerConfig, SubjectKey};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Deferred callback
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Callbacks registered for one key, in registration order
type ActionSet = SmallVec<[Action; 1]>;

/// A scheduled entry
struct PendingEntry {
    /// Live timer; aborted when the entry is replaced or dropped
    timer: JoinHandle<()>,
    actions: ActionSet,
    /// When the entry was last (re)scheduled
    timestamp: Instant,
    /// Unique per (re)schedule; breaks timestamp ties and identifies the live timer
    sequence: u64,
}

#[derive(Default)]
struct SchedulerState {
    entries: AHashMap<ActionKey, PendingEntry>,
    debouncing: AHashMap<ActionKey, bool>,
    next_sequence: u64,
}

impl SchedulerState {
    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    /// Remove an entry, stop its timer, and forget the key
    fn take(&mut self, key: &ActionKey) -> Option<PendingEntry> {
        let entry = self.entries.remove(key)?;
        entry.timer.abort();
        self.debouncing.remove(key);
        Some(entry)
    }

    /// Group members, oldest first
    fn group_members(&self, group: &str) -> Vec<(Instant, u64, &ActionKey)> {
        let mut members: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| key.in_group(group))
            .map(|(key, entry)| (entry.timestamp, entry.sequence, key))
            .collect();
        members.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        members
    }

    /// Drop the oldest entries of `group` until at most `cap` remain
    ///
    /// Evicted keys are forgotten entirely, including their debouncing state.
    fn prune_group(&mut self, group: &str, cap: usize) -> Vec<(ActionKey, PendingEntry)> {
        let members = self.group_members(group);
        if members.len() <= cap {
            return Vec::new();
        }

        let excess = members.len() - cap;
        let victims: Vec<ActionKey> = members
            .into_iter()
            .take(excess)
            .map(|(_, _, key)| key.clone())
            .collect();

        victims
            .into_iter()
            .filter_map(|key| {
                let entry = self.entries.remove(&key)?;
                entry.timer.abort();
                self.debouncing.remove(&key);
                Some((key, entry))
            })
            .collect()
    }

    fn debouncing_count(&self) -> usize {
        self.debouncing.values().filter(|d| **d).count()
    }
}

struct Inner {
    config: DebouncerConfig,
    runtime: Handle,
    state: Mutex<SchedulerState>,
    observer: Option<Arc<dyn StateObserver>>,
    counters: Counters,
}

impl Inner {
    fn notify(&self, changes: &[StateChange]) {
        if let Some(observer) = &self.observer {
            for change in changes {
                observer.on_state_change(change);
            }
        }
    }

    /// Timer callback; only the timer of the current schedule may fire
    fn fire(&self, key: &ActionKey, sequence: u64) {
        let entry = {
            let mut state = self.state.lock();
            if state.entries.get(key).map(|e| e.sequence) != Some(sequence) {
                return;
            }
            state.debouncing.remove(key);
            state.entries.remove(key)
        };

        let Some(entry) = entry else { return };

        debug!("Debounce fired for {}", key);
        self.counters.fired();
        self.notify(&[StateChange::new(key.clone(), ChangeCause::Fired)]);
        run_actions(entry.actions);
    }

    fn flush(&self, key: &ActionKey) -> bool {
        // Taking the entry under the lock stops a concurrently waking timer from also running it
        let entry = self.state.lock().take(key);

        match entry {
            Some(entry) => {
                debug!("Flushing {}", key);
                self.counters.flushed();
                self.notify(&[StateChange::new(key.clone(), ChangeCause::Flushed)]);
                run_actions(entry.actions);
                true
            }
            None => false,
        }
    }

    fn cancel(&self, key: &ActionKey) -> bool {
        let entry = self.state.lock().take(key);

        match entry {
            Some(entry) => {
                debug!("Cancelled {}", key);
                self.counters.cancelled(1);
                self.notify(&[StateChange::new(key.clone(), ChangeCause::Cancelled)]);
                drop(entry);
                true
            }
            None => false,
        }
    }

    fn cancel_where(&self, mut matches: impl FnMut(&ActionKey) -> bool) -> Vec<ActionKey> {
        let dropped: Vec<(ActionKey, PendingEntry)> = {
            let mut state = self.state.lock();
            let keys: Vec<ActionKey> = state
                .entries
                .keys()
                .filter(|key| matches(key))
                .cloned()
                .collect();

            keys.into_iter()
                .filter_map(|key| state.take(&key).map(|entry| (key, entry)))
                .collect()
        };

        self.counters.cancelled(dropped.len());
        let changes: Vec<StateChange> = dropped
            .iter()
            .map(|(key, _)| StateChange::new(key.clone(), ChangeCause::Cancelled))
            .collect();
        self.notify(&changes);

        dropped.into_iter().map(|(key, _)| key).collect()
    }

    fn is_debouncing(&self, key: &ActionKey) -> bool {
        self.state.lock().debouncing.get(key).copied().unwrap_or(false)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, entry) in self.state.get_mut().entries.drain() {
            entry.timer.abort();
        }
    }
}

fn run_actions(actions: ActionSet) {
    for action in actions {
        action();
    }
}

/// Keyed debounce scheduler
///
/// Cheap to clone; clones share state. Timers run on the tokio runtime the
/// scheduler was built on. Dropping the last clone aborts every pending timer.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

impl Debouncer {
    /// Create a scheduler on the current tokio runtime
    pub fn new(config: DebouncerConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn builder() -> DebouncerBuilder {
        DebouncerBuilder::default()
    }

    /// Configuration defaults this scheduler was built with
    pub fn config(&self) -> &DebouncerConfig {
        &self.inner.config
    }

    /// Schedule `action` to run after the quiet period for `key`
    ///
    /// Any action still pending for the same `(group, key)` is discarded
    /// without running, and its timer restarts. If the group ends up over
    /// its cap, its oldest entries are dropped.
    pub fn schedule<K, F, O>(&self, key: K, action: F, options: O) -> DebounceHandle
    where
        K: Into<SubjectKey>,
        F: FnOnce() + Send + 'static,
        O: Into<DebounceOptions>,
    {
        let options = options.into().resolve(&self.inner.config);
        let action_key = ActionKey::new(&options.group, key);

        let mut actions = ActionSet::new();
        actions.push(Box::new(action) as Action);

        let (replaced, evicted) = {
            let mut state = self.inner.state.lock();

            let replaced = state.entries.remove(&action_key).map(|previous| {
                previous.timer.abort();
                previous
            });

            let sequence = state.next_sequence();
            let timer = self.spawn_timer(action_key.clone(), sequence, options.delay);
            state.entries.insert(
                action_key.clone(),
                PendingEntry {
                    timer,
                    actions,
                    timestamp: Instant::now(),
                    sequence,
                },
            );
            state.debouncing.insert(action_key.clone(), true);

            let evicted = match options.cap() {
                Some(cap) => state.prune_group(&options.group, cap),
                None => Vec::new(),
            };

            (replaced, evicted)
        };

        debug!(
            "Scheduled {} in {:?}{}",
            action_key,
            options.delay,
            if replaced.is_some() { " (replaced pending action)" } else { "" }
        );
        self.inner.counters.scheduled(replaced.is_some());

        let mut changes = Vec::with_capacity(1 + evicted.len());
        changes.push(StateChange::new(action_key.clone(), ChangeCause::Scheduled));
        if !evicted.is_empty() {
            info!(
                "Evicted {} entries from group '{}' (cap {})",
                evicted.len(),
                options.group,
                options.max_cache_data
            );
            self.inner.counters.evicted(evicted.len());
            changes.extend(
                evicted
                    .iter()
                    .map(|(key, _)| StateChange::new(key.clone(), ChangeCause::Evicted)),
            );
        }
        self.inner.notify(&changes);

        // Discarded actions are dropped outside the lock
        drop(replaced);
        drop(evicted);

        DebounceHandle {
            inner: Arc::downgrade(&self.inner),
            key: action_key,
        }
    }

    fn spawn_timer(&self, key: ActionKey, sequence: u64, delay: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire(&key, sequence);
            }
        })
    }

    fn resolve_key(&self, key: impl Into<SubjectKey>, group: Option<&str>) -> ActionKey {
        let group = group.unwrap_or(self.inner.config.default_group.as_str());
        ActionKey::new(group, key)
    }

    /// Whether `key` has a pending timer; `None` means the default group
    pub fn is_debouncing(&self, key: impl Into<SubjectKey>, group: Option<&str>) -> bool {
        self.inner.is_debouncing(&self.resolve_key(key, group))
    }

    /// Run the pending action for `key` now
    ///
    /// Returns `true` if an entry was pending. The action runs synchronously
    /// on the calling thread, exactly once.
    pub fn flush(&self, key: impl Into<SubjectKey>, group: Option<&str>) -> bool {
        self.inner.flush(&self.resolve_key(key, group))
    }

    /// Drop the pending action for `key` without running it
    ///
    /// Returns `true` if an entry was pending.
    pub fn cancel(&self, key: impl Into<SubjectKey>, group: Option<&str>) -> bool {
        self.inner.cancel(&self.resolve_key(key, group))
    }

    /// Drop every pending action in `group`; returns how many were dropped
    pub fn cancel_by_group(&self, group: &str) -> usize {
        let cancelled = self.inner.cancel_where(|key| key.in_group(group));
        if !cancelled.is_empty() {
            info!("Cancelled {} pending actions in group '{}'", cancelled.len(), group);
        }
        cancelled.len()
    }

    /// Drop every pending action; returns how many were dropped
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.inner.cancel_where(|_| true).len();
        if cancelled > 0 {
            info!("Cancelled all {} pending actions", cancelled);
        }
        cancelled
    }

    /// Keys tracked in `group`, oldest first, without the group prefix
    pub fn active_keys_by_group(&self, group: &str) -> Vec<String> {
        self.inner
            .state
            .lock()
            .group_members(group)
            .into_iter()
            .map(|(_, _, key)| key.key().to_string())
            .collect()
    }

    /// Number of entries tracked in `group`
    pub fn active_count_by_group(&self, group: &str) -> usize {
        self.inner
            .state
            .lock()
            .entries
            .keys()
            .filter(|key| key.in_group(group))
            .count()
    }

    pub fn stats(&self) -> DebouncerStats {
        let state = self.inner.state.lock();
        self.inner
            .counters
            .snapshot(state.entries.len(), state.debouncing_count())
    }

    /// Cancel everything and release this handle to the scheduler
    pub fn dispose(self) {
        let cancelled = self.cancel_all();
        info!("Debouncer disposed ({} pending actions dropped)", cancelled);
    }
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Debouncer")
            .field("config", &self.inner.config)
            .field("tracked", &state.entries.len())
            .field("debouncing", &state.debouncing_count())
            .finish()
    }
}

/// Builder for [`Debouncer`]
#[derive(Default)]
pub struct DebouncerBuilder {
    config: DebouncerConfig,
    runtime: Option<Handle>,
    observer: Option<Arc<dyn StateObserver>>,
}

impl DebouncerBuilder {
    pub fn config(mut self, config: DebouncerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run timers on `handle` instead of the current runtime
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Report state changes to `observer`
    pub fn observer(mut self, observer: impl StateObserver) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn build(self) -> Result<Debouncer> {
        self.config.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| DebouncerError::NoRuntime)?,
        };

        Ok(Debouncer {
            inner: Arc::new(Inner {
                config: self.config,
                runtime,
                state: Mutex::new(SchedulerState::default()),
                observer: self.observer,
                counters: Counters::default(),
            }),
        })
    }
}

/// Handle to one scheduled entry
///
/// Reads are live: `is_debouncing` reflects the state at the time of the
/// call, not at the time of scheduling. The handle does not keep the
/// scheduler alive; once it is gone every operation is a no-op.
#[derive(Clone)]
pub struct DebounceHandle {
    inner: Weak<Inner>,
    key: ActionKey,
}

impl DebounceHandle {
    /// Resolved key of the entry
    pub fn key(&self) -> &ActionKey {
        &self.key
    }

    pub fn is_debouncing(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.is_debouncing(&self.key))
            .unwrap_or(false)
    }

    /// Drop the entry without running it
    pub fn cancel(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.cancel(&self.key))
            .unwrap_or(false)
    }

    /// Run the entry now
    pub fn flush(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.flush(&self.key))
            .unwrap_or(false)
    }
}

impl fmt::Debug for DebounceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceHandle")
            .field("key", &self.key)
            .field("debouncing", &self.is_debouncing())
            .finish()
    }
}
