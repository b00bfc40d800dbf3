//! Thread Affinity Tests
//!
//! - Mutations from a foreign thread are rejected before touching state
//! - Every rejection is counted

use std::sync::Arc;
use std::thread;

use causeway::cause::{CauseHandle, GameRoot};
use causeway::observability::TrackerMetrics;
use causeway::tracker::{PhaseError, PhaseKind, PhaseTracker, TrackerConfig};
use causeway::world::{BlockPos, BlockState, WorldId};

fn tracker() -> (PhaseTracker, Arc<TrackerMetrics>) {
    let metrics = Arc::new(TrackerMetrics::new());
    (PhaseTracker::new(TrackerConfig::default(), metrics.clone()), metrics)
}

// =============================================================================
// Rejection Tests
// =============================================================================

/// A foreign push is rejected and leaves the stack empty.
#[test]
fn test_foreign_push_rejected() {
    let (tracker, metrics) = tracker();

    let result = thread::scope(|s| {
        s.spawn(|| tracker.enter(PhaseKind::Command).map(|guard| guard.id()))
            .join()
            .unwrap()
    });

    assert!(matches!(result, Err(PhaseError::IllegalThread(_))));
    assert!(tracker.is_idle());
    assert_eq!(metrics.illegal_thread_accesses(), 1);
}

/// A foreign capture is rejected, not recorded into the owner's phase.
#[test]
fn test_foreign_capture_rejected() {
    let (tracker, metrics) = tracker();
    let phase = tracker.enter(PhaseKind::BlockTick).unwrap();

    let err = thread::scope(|s| {
        s.spawn(|| {
            let pos = BlockPos::new(WorldId::new(), 0, 0, 0);
            tracker.record_block(pos, BlockState::air(), BlockState::new("stone"))
        })
        .join()
        .unwrap()
        .unwrap_err()
    });

    assert!(!err.is_fatal());
    assert_eq!(err.code(), "CAUSEWAY_ILLEGAL_THREAD");
    assert_eq!(tracker.with_current_phase(|c| c.transactions().len()), Some(0));
    assert_eq!(metrics.missed_captures(), 0);
    phase.close().unwrap();
}

/// A foreign cause push leaves the cause stack unchanged.
#[test]
fn test_foreign_cause_push_rejected() {
    let (tracker, metrics) = tracker();
    let before = tracker.causes().cause_len();

    let rejected = thread::scope(|s| {
        s.spawn(|| tracker.causes().push_cause(CauseHandle::new(GameRoot::new("intruder"))).is_err())
            .join()
            .unwrap()
    });

    assert!(rejected);
    assert_eq!(tracker.causes().cause_len(), before);
    assert_eq!(metrics.illegal_thread_accesses(), 1);
}

/// Read-only queries are allowed from any thread.
#[test]
fn test_foreign_reads_allowed() {
    let (tracker, metrics) = tracker();
    let phase = tracker.enter(PhaseKind::WorldTick).unwrap();

    let depth = thread::scope(|s| s.spawn(|| tracker.depth()).join().unwrap());

    assert_eq!(depth, 1);
    assert_eq!(metrics.illegal_thread_accesses(), 0);
    phase.close().unwrap();
}
