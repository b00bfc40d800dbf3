//! Tracker metrics
//!
//! - Counters only, plus a cumulative phase time
//! - Monotonic increase
//! - Atomic, so the registry can be read from any thread while the tick
//!   thread writes

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::ThreadId;
use std::time::Duration;

use serde::Serialize;

use super::hooks::PhaseObserver;
use crate::tracker::PhaseKind;

/// Counters fed by the `PhaseObserver` callbacks.
///
/// Uses Relaxed ordering; the numbers are diagnostics, not synchronization.
#[derive(Debug, Default)]
pub struct TrackerMetrics {
    /// Phases popped
    phases_completed: AtomicU64,
    /// Total time spent inside phases, in microseconds
    phase_time_micros: AtomicU64,
    /// Longest single phase, in microseconds
    longest_phase_micros: AtomicU64,
    /// Captures dropped for lack of an eligible phase
    missed_captures: AtomicU64,
    /// Captures recorded into a phase
    transactions_captured: AtomicU64,
    /// Mutations rejected for running on the wrong thread
    illegal_thread_accesses: AtomicU64,
    /// Listener errors and panics
    listener_failures: AtomicU64,
    /// Events dispatched
    events_posted: AtomicU64,
    /// Events that ended cancelled
    events_cancelled: AtomicU64,
    /// Failed external-to-local syncs
    sync_failures: AtomicU64,
    /// Stack discipline violations
    fatal_errors: AtomicU64,
}

impl TrackerMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Missed capture count
    pub fn missed_captures(&self) -> u64 {
        self.missed_captures.load(Ordering::Relaxed)
    }

    /// Illegal thread access count
    pub fn illegal_thread_accesses(&self) -> u64 {
        self.illegal_thread_accesses.load(Ordering::Relaxed)
    }

    /// Listener failure count
    pub fn listener_failures(&self) -> u64 {
        self.listener_failures.load(Ordering::Relaxed)
    }

    /// Completed phase count
    pub fn phases_completed(&self) -> u64 {
        self.phases_completed.load(Ordering::Relaxed)
    }

    /// Fatal error count
    pub fn fatal_errors(&self) -> u64 {
        self.fatal_errors.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            phases_completed: self.phases_completed.load(Ordering::Relaxed),
            phase_time_micros: self.phase_time_micros.load(Ordering::Relaxed),
            longest_phase_micros: self.longest_phase_micros.load(Ordering::Relaxed),
            missed_captures: self.missed_captures.load(Ordering::Relaxed),
            transactions_captured: self.transactions_captured.load(Ordering::Relaxed),
            illegal_thread_accesses: self.illegal_thread_accesses.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            events_posted: self.events_posted.load(Ordering::Relaxed),
            events_cancelled: self.events_cancelled.load(Ordering::Relaxed),
            sync_failures: self.sync_failures.load(Ordering::Relaxed),
            fatal_errors: self.fatal_errors.load(Ordering::Relaxed),
        }
    }

    /// Snapshot rendered as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

impl PhaseObserver for TrackerMetrics {
    fn phase_duration(&self, _kind: PhaseKind, _location: &str, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.phases_completed.fetch_add(1, Ordering::Relaxed);
        self.phase_time_micros.fetch_add(micros, Ordering::Relaxed);
        self.longest_phase_micros.fetch_max(micros, Ordering::Relaxed);
    }

    fn missed_capture(&self, _description: &str) {
        self.missed_captures.fetch_add(1, Ordering::Relaxed);
    }

    fn illegal_thread_access(&self, _caller: ThreadId, _owner: ThreadId) {
        self.illegal_thread_accesses.fetch_add(1, Ordering::Relaxed);
    }

    fn listener_failed(&self, _owner: &str, _event_type: &str) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn transaction_captured(&self) {
        self.transactions_captured.fetch_add(1, Ordering::Relaxed);
    }

    fn event_posted(&self, _event_type: &str, cancelled: bool) {
        self.events_posted.fetch_add(1, Ordering::Relaxed);
        if cancelled {
            self.events_cancelled.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn sync_failed(&self, _event_type: &str) {
        self.sync_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn fatal(&self, _code: &'static str) {
        self.fatal_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub phases_completed: u64,
    pub phase_time_micros: u64,
    pub longest_phase_micros: u64,
    pub missed_captures: u64,
    pub transactions_captured: u64,
    pub illegal_thread_accesses: u64,
    pub listener_failures: u64,
    pub events_posted: u64,
    pub events_cancelled: u64,
    pub sync_failures: u64,
    pub fatal_errors: u64,
}
