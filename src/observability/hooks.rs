//! Observer callbacks
//!
//! The tracker, cause stack and event buses report into a `PhaseObserver`.
//! What the observer does with the numbers (exporting, rendering) is up to
//! the host; `TrackerMetrics` keeps plain counters.

use std::thread::ThreadId;
use std::time::Duration;

use crate::tracker::PhaseKind;

/// Narrow callback interface for phase and dispatch instrumentation.
///
/// Implementations must be cheap: they run inline on the tick thread.
pub trait PhaseObserver: Send + Sync {
    /// A phase was popped after running for `elapsed`.
    fn phase_duration(&self, kind: PhaseKind, location: &str, elapsed: Duration);

    /// A capture call had no eligible phase to receive it.
    fn missed_capture(&self, description: &str);

    /// A mutation was attempted from a thread other than the owner.
    fn illegal_thread_access(&self, caller: ThreadId, owner: ThreadId);

    /// A listener returned an error or panicked.
    fn listener_failed(&self, _owner: &str, _event_type: &str) {}

    /// A transaction was recorded into a phase.
    fn transaction_captured(&self) {}

    /// An event finished dispatch.
    fn event_posted(&self, _event_type: &str, _cancelled: bool) {}

    /// External state could not be synced back into a local event.
    fn sync_failed(&self, _event_type: &str) {}

    /// A stack discipline violation was detected.
    fn fatal(&self, _code: &'static str) {}
}

/// Observer that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PhaseObserver for NoopObserver {
    fn phase_duration(&self, _kind: PhaseKind, _location: &str, _elapsed: Duration) {}

    fn missed_capture(&self, _description: &str) {}

    fn illegal_thread_access(&self, _caller: ThreadId, _owner: ThreadId) {}
}
