//! Listener Fault Isolation Tests
//!
//! - A failing or panicking listener never stops later listeners
//! - Its cancellation change is discarded
//! - Failures are counted

use std::sync::{Arc, Mutex};

use causeway::cause::{Cause, CauseHandle, GameRoot};
use causeway::event::{Event, EventManager, ListenerError, Order, PluginId};
use causeway::observability::TrackerMetrics;

struct Alarm {
    cause: Cause,
    cancelled: bool,
}

impl Alarm {
    fn new() -> Self {
        Self {
            cause: Cause::of(vec![CauseHandle::new(GameRoot::new("test"))]),
            cancelled: false,
        }
    }
}

impl Event for Alarm {
    fn cause(&self) -> &Cause {
        &self.cause
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

fn manager() -> (EventManager, Arc<TrackerMetrics>, Arc<Mutex<Vec<&'static str>>>) {
    let metrics = Arc::new(TrackerMetrics::new());
    (EventManager::new(metrics.clone()), metrics, Arc::new(Mutex::new(Vec::new())))
}

fn mark(calls: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) {
    calls.lock().unwrap().push(name);
}

// =============================================================================
// Isolation Tests
// =============================================================================

/// first runs, second fails, third still runs.
#[test]
fn test_failing_listener_is_isolated() {
    let (events, metrics, calls) = manager();

    let log = Arc::clone(&calls);
    events
        .register(&PluginId::new("first"), Order::EARLY, move |_: &mut Alarm| {
            mark(&log, "first");
            Ok(())
        })
        .unwrap();
    let log = Arc::clone(&calls);
    events
        .register(&PluginId::new("second"), Order::DEFAULT, move |e: &mut Alarm| {
            mark(&log, "second");
            e.set_cancelled(true);
            Err(ListenerError::failed("database offline"))
        })
        .unwrap();
    let log = Arc::clone(&calls);
    events
        .register(&PluginId::new("third"), Order::LATE, move |_: &mut Alarm| {
            mark(&log, "third");
            Ok(())
        })
        .unwrap();

    let mut alarm = Alarm::new();
    let cancelled = events.post(&mut alarm);

    assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    assert!(!cancelled);
    assert_eq!(metrics.listener_failures(), 1);
}

/// A panicking listener is caught like an error.
#[test]
fn test_panicking_listener_is_isolated() {
    let (events, metrics, calls) = manager();

    events
        .register(&PluginId::new("boom"), Order::FIRST, |_: &mut Alarm| -> causeway::event::ListenerResult {
            panic!("listener exploded")
        })
        .unwrap();
    let log = Arc::clone(&calls);
    events
        .register(&PluginId::new("after"), Order::LAST, move |_: &mut Alarm| {
            mark(&log, "after");
            Ok(())
        })
        .unwrap();

    let mut alarm = Alarm::new();
    events.post(&mut alarm);

    assert_eq!(*calls.lock().unwrap(), vec!["after"]);
    assert_eq!(metrics.listener_failures(), 1);
}

/// A cancellation made before a failing listener survives it.
#[test]
fn test_earlier_cancellation_survives_failure() {
    let (events, metrics, _) = manager();

    events
        .register(&PluginId::new("veto"), Order::EARLY, |e: &mut Alarm| {
            e.set_cancelled(true);
            Ok(())
        })
        .unwrap();
    events
        .register(&PluginId::new("undo"), Order::LATE, |e: &mut Alarm| {
            e.set_cancelled(false);
            Err(ListenerError::failed("gave up"))
        })
        .unwrap();

    let mut alarm = Alarm::new();
    assert!(events.post(&mut alarm));
    assert_eq!(metrics.listener_failures(), 1);
    assert_eq!(metrics.snapshot().events_cancelled, 1);
}
