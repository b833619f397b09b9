//! Scheduler counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of scheduler activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebouncerStats {
    /// `schedule` calls
    pub scheduled: u64,
    /// Schedules that replaced a pending action for the same key
    pub replaced: u64,
    /// Entries whose timer elapsed
    pub fired: u64,
    /// Entries run early by `flush`
    pub flushed: u64,
    /// Entries dropped by any cancel operation
    pub cancelled: u64,
    /// Entries dropped by group eviction
    pub evicted: u64,
    /// Entries currently tracked
    pub tracked: usize,
    /// Keys currently debouncing
    pub debouncing: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    scheduled: AtomicU64,
    replaced: AtomicU64,
    fired: AtomicU64,
    flushed: AtomicU64,
    cancelled: AtomicU64,
    evicted: AtomicU64,
}

impl Counters {
    pub fn scheduled(&self, replaced: bool) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.replaced.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn fired(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flushed(&self) {
        self.flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cancelled(&self, n: usize) {
        self.cancelled.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn evicted(&self, n: usize) {
        self.evicted.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, tracked: usize, debouncing: usize) -> DebouncerStats {
        DebouncerStats {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            fired: self.fired.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            tracked,
            debouncing,
        }
    }
}
