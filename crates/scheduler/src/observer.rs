//! State-change notifications
//!
//! The scheduler reports every lifecycle event of an entry through a
//! [`StateObserver`]. Reactive layers can subscribe with a closure or with a
//! [`ChannelObserver`] and re-read `is_debouncing` when notified, instead of
//! holding on to a stale snapshot.

use coalesce_core::ActionKey;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::warn;

/// What happened to an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeCause {
    /// Scheduled or rescheduled
    Scheduled,
    /// Timer elapsed and the actions ran
    Fired,
    /// Forced to run early
    Flushed,
    /// Dropped by `cancel`, `cancel_by_group`, `cancel_all`, or dispose
    Cancelled,
    /// Dropped to keep the group under its cap
    Evicted,
}

impl ChangeCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeCause::Scheduled => "scheduled",
            ChangeCause::Fired => "fired",
            ChangeCause::Flushed => "flushed",
            ChangeCause::Cancelled => "cancelled",
            ChangeCause::Evicted => "evicted",
        }
    }
}

/// One state transition of one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub key: ActionKey,
    /// Debouncing state after the change
    pub debouncing: bool,
    pub cause: ChangeCause,
}

impl StateChange {
    pub(crate) fn new(key: ActionKey, cause: ChangeCause) -> Self {
        Self {
            key,
            debouncing: cause == ChangeCause::Scheduled,
            cause,
        }
    }
}

/// Receives state changes
///
/// Called outside the scheduler's lock, from whichever thread caused the
/// change (the caller for schedule/cancel/flush, a runtime worker for timers).
pub trait StateObserver: Send + Sync + 'static {
    fn on_state_change(&self, change: &StateChange);
}

impl<F> StateObserver for F
where
    F: Fn(&StateChange) + Send + Sync + 'static,
{
    fn on_state_change(&self, change: &StateChange) {
        self(change)
    }
}

/// Observer forwarding every change into an unbounded channel
///
/// The channel carries any `T: From<StateChange>`, so callers can merge
/// state changes with their own events on a single ordered stream.
pub struct ChannelObserver<T = StateChange> {
    tx: mpsc::UnboundedSender<T>,
    closed: AtomicBool,
}

impl ChannelObserver {
    /// Create observer and the receiving end of its channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StateChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::from_sender(tx), rx)
    }
}

impl<T> ChannelObserver<T> {
    /// Forward into an existing channel
    pub fn from_sender(tx: mpsc::UnboundedSender<T>) -> Self {
        Self {
            tx,
            closed: AtomicBool::new(false),
        }
    }
}

impl<T> StateObserver for ChannelObserver<T>
where
    T: From<StateChange> + Send + 'static,
{
    fn on_state_change(&self, change: &StateChange) {
        if self.tx.send(T::from(change.clone())).is_err()
            && !self.closed.swap(true, Ordering::Relaxed)
        {
            warn!("State change receiver dropped; further changes are discarded");
        }
    }
}
