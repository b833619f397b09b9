//! Keyed debounce scheduling for Coalesce
//!
//! This crate provides the in-process scheduler that coalesces repeated
//! intent signals (repeated taps, keystrokes, toggles) with:
//! - Per-key last-call-wins debouncing (500ms default)
//! - Group namespaces with bounded capacity and oldest-first eviction
//! - Flush/cancel by key, by group, or globally
//! - State-change notifications for reactive layers

pub mod debounce;
pub mod error;
pub mod observer;
pub mod stats;

pub use debounce::{Action, DebounceHandle, Debouncer, DebouncerBuilder};
pub use error::DebouncerError;
pub use observer::{ChangeCause, ChannelObserver, StateChange, StateObserver};
pub use stats::DebouncerStats;

// Re-export the key and option types callers need to schedule
pub use coalesce_core::{ActionKey, DebounceOptions, DebouncerConfig, SubjectKey};
