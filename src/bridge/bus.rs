//! Dual posting protocol
//!
//! Local to external, for one local event and its external counterparts:
//!
//! 1. local listeners in the before tier run
//! 2. if any ran, local state is synced into every external event
//! 3. each external event is posted on the external bus, then its state is
//!    synced back into the local event
//! 4. local listeners in the after tier run
//!
//! External to local: an external event with a registered local form is
//! posted once on the external bus, synced into its local form, posted
//! through the ordinary `EventManager` path and synced back. The external
//! bus never sees it a second time.

use std::sync::{Arc, RwLock};

use super::errors::{BridgeError, BridgeResult, SyncError};
use crate::event::{Event, EventManager, EventType};
use crate::observability::{LogEvent, Logger};

/// The second event bus
pub trait ExternalBus: Send + Sync {
    type Event: Send + 'static;

    /// Dispatch to the external listeners; returns the cancellation state
    fn post(&self, event: &mut Self::Event) -> bool;
}

/// A local event with an external counterpart `X`.
///
/// Both directions copy an explicit list of fields. `sync_from_external`
/// must validate before assigning: on error, no local field changes.
pub trait DualBusEvent<X>: Event {
    fn sync_into_external(&self, external: &mut X);

    fn sync_from_external(&mut self, external: &X) -> Result<(), SyncError>;
}

/// Result of a dual post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DualPostOutcome {
    pub cancelled: bool,
    /// External events whose state was pulled back
    pub synced: usize,
    pub sync_failures: usize,
}

type Adapter<B> = Arc<dyn Fn(&DualBusBridge<B>, &mut <B as ExternalBus>::Event) -> Option<bool> + Send + Sync>;

/// Joins an `EventManager` to an external bus
pub struct DualBusBridge<B: ExternalBus> {
    events: Arc<EventManager>,
    bus: B,
    adapters: RwLock<Vec<Adapter<B>>>,
}

impl<B: ExternalBus + 'static> DualBusBridge<B> {
    pub fn new(events: Arc<EventManager>, bus: B) -> Self {
        Self {
            events,
            bus,
            adapters: RwLock::new(Vec::new()),
        }
    }

    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Post `local` through both buses
    pub fn post_dual<E>(&self, local: &mut E, externals: &mut [B::Event]) -> DualPostOutcome
    where
        E: DualBusEvent<B::Event>,
    {
        let event_type = EventType::of::<E>();
        let bake = self.events.bake_for(event_type);
        let mut outcome = DualPostOutcome::default();

        self.events.run_tier(local, event_type, &bake.before);
        if !bake.before.is_empty() {
            for external in externals.iter_mut() {
                local.sync_into_external(external);
            }
        }

        for external in externals.iter_mut() {
            self.bus.post(external);
            match local.sync_from_external(external) {
                Ok(()) => outcome.synced += 1,
                Err(err) => {
                    outcome.sync_failures += 1;
                    self.report_sync_failure(event_type, &err);
                }
            }
        }

        self.events.run_tier(local, event_type, &bake.after);
        outcome.cancelled = self.events.finish(local, event_type);
        outcome
    }

    /// Give external events matched by `from_external` a local form.
    ///
    /// `from_external` only decides the mapping and builds the initial local
    /// event; state after external dispatch arrives via
    /// `sync_from_external`. Adapters are tried in registration order.
    pub fn register_external<E, F>(&self, from_external: F) -> BridgeResult<()>
    where
        E: DualBusEvent<B::Event>,
        F: Fn(&B::Event) -> Option<E> + Send + Sync + 'static,
    {
        let adapter: Adapter<B> = Arc::new(move |bridge: &DualBusBridge<B>, external: &mut B::Event| {
            let mut local = from_external(external)?;
            Some(bridge.dispatch_external_origin(&mut local, external))
        });
        self.adapters
            .write()
            .map_err(|_| BridgeError::Internal("adapter lock poisoned".into()))?
            .push(adapter);
        Ok(())
    }

    /// Entry point for events raised on the external bus.
    ///
    /// Returns the final cancellation state.
    pub fn post_external(&self, external: &mut B::Event) -> bool {
        let adapters: Vec<Adapter<B>> = match self.adapters.read() {
            Ok(adapters) => adapters.clone(),
            Err(_) => Vec::new(),
        };
        for adapter in &adapters {
            if let Some(cancelled) = adapter(self, external) {
                return cancelled;
            }
        }
        self.bus.post(external)
    }

    fn dispatch_external_origin<E>(&self, local: &mut E, external: &mut B::Event) -> bool
    where
        E: DualBusEvent<B::Event>,
    {
        let event_type = EventType::of::<E>();
        self.bus.post(external);
        if let Err(err) = local.sync_from_external(external) {
            self.report_sync_failure(event_type, &err);
        }
        let cancelled = self.events.post(local);
        local.sync_into_external(external);
        cancelled
    }

    fn report_sync_failure(&self, event_type: EventType, err: &SyncError) {
        self.events.observer().sync_failed(event_type.name());
        let reason = err.to_string();
        Logger::event(
            LogEvent::DualSyncFailed,
            &[
                ("event_type", event_type.name()),
                ("code", err.code()),
                ("reason", &reason),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cause::{Cause, CauseHandle, GameRoot};
    use crate::event::{ListenerOptions, PluginId};
    use crate::observability::TrackerMetrics;

    #[derive(Debug, Default)]
    struct ExternalDrop {
        experience: i32,
        cancelled: bool,
        kind: &'static str,
    }

    type ExternalListener = Box<dyn Fn(&mut ExternalDrop) + Send + Sync>;

    struct TestBus {
        posts: AtomicUsize,
        listeners: Vec<ExternalListener>,
    }

    impl ExternalBus for TestBus {
        type Event = ExternalDrop;

        fn post(&self, event: &mut ExternalDrop) -> bool {
            self.posts.fetch_add(1, Ordering::Relaxed);
            for listener in &self.listeners {
                listener(event);
            }
            event.cancelled
        }
    }

    struct LocalDrop {
        cause: Cause,
        experience: i32,
        cancelled: bool,
    }

    impl LocalDrop {
        fn new(experience: i32) -> Self {
            Self {
                cause: Cause::of(vec![CauseHandle::new(GameRoot::new("test"))]),
                experience,
                cancelled: false,
            }
        }
    }

    impl Event for LocalDrop {
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

    impl DualBusEvent<ExternalDrop> for LocalDrop {
        fn sync_into_external(&self, external: &mut ExternalDrop) {
            external.experience = self.experience;
            external.cancelled = self.cancelled;
        }

        fn sync_from_external(&mut self, external: &ExternalDrop) -> Result<(), SyncError> {
            if external.experience < 0 {
                return Err(SyncError::invalid("experience", "negative"));
            }
            self.experience = external.experience;
            self.cancelled = external.cancelled;
            Ok(())
        }
    }

    fn bridge(listeners: Vec<ExternalListener>) -> (DualBusBridge<TestBus>, Arc<TrackerMetrics>) {
        let metrics = Arc::new(TrackerMetrics::new());
        let events = Arc::new(EventManager::new(metrics.clone()));
        let bus = TestBus {
            posts: AtomicUsize::new(0),
            listeners,
        };
        (DualBusBridge::new(events, bus), metrics)
    }

    #[test]
    fn test_sync_failure_keeps_local_value() {
        let (bridge, metrics) = bridge(vec![Box::new(|e: &mut ExternalDrop| e.experience = -5) as ExternalListener]);
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        bridge
            .events()
            .register(&PluginId::new("p"), 0, move |e: &mut LocalDrop| {
                sink.store(e.experience as usize, Ordering::Relaxed);
                Ok(())
            })
            .unwrap();

        let mut local = LocalDrop::new(3);
        let mut externals = vec![ExternalDrop::default()];
        let outcome = bridge.post_dual(&mut local, &mut externals);

        assert_eq!(outcome.sync_failures, 1);
        assert_eq!(outcome.synced, 0);
        assert_eq!(local.experience, 3);
        assert_eq!(seen.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.snapshot().sync_failures, 1);
    }

    #[test]
    fn test_empty_before_tier_skips_sync_into() {
        let (bridge, _) = bridge(Vec::new());
        let mut local = LocalDrop::new(4);
        let mut externals = vec![ExternalDrop {
            experience: 9,
            ..ExternalDrop::default()
        }];

        bridge.post_dual(&mut local, &mut externals);
        assert_eq!(local.experience, 9);
    }

    #[test]
    fn test_later_external_overwrites_earlier() {
        let (bridge, _) = bridge(vec![Box::new(|e: &mut ExternalDrop| {
            e.experience += if e.kind == "first" { 10 } else { 20 };
        }) as ExternalListener]);
        bridge
            .events()
            .register_with(
                &PluginId::new("p"),
                ListenerOptions::default().before_modifications(),
                |e: &mut LocalDrop| {
                    e.experience = 1;
                    Ok(())
                },
            )
            .unwrap();

        let mut local = LocalDrop::new(0);
        let mut externals = vec![
            ExternalDrop {
                kind: "first",
                ..ExternalDrop::default()
            },
            ExternalDrop {
                kind: "second",
                ..ExternalDrop::default()
            },
        ];
        let outcome = bridge.post_dual(&mut local, &mut externals);

        assert_eq!(outcome.synced, 2);
        assert_eq!(externals[0].experience, 11);
        assert_eq!(externals[1].experience, 21);
        assert_eq!(local.experience, 21);
    }

    #[test]
    fn test_external_origin_without_adapter_is_forwarded() {
        let (bridge, _) = bridge(vec![Box::new(|e: &mut ExternalDrop| e.cancelled = true) as ExternalListener]);
        let mut external = ExternalDrop::default();

        assert!(bridge.post_external(&mut external));
        assert_eq!(bridge.bus().posts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_external_origin_with_adapter_posts_each_bus_once() {
        let (bridge, _) = bridge(vec![Box::new(|e: &mut ExternalDrop| e.experience += 10) as ExternalListener]);
        let local_posts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&local_posts);
        bridge
            .events()
            .register(&PluginId::new("p"), 0, move |e: &mut LocalDrop| {
                counter.fetch_add(1, Ordering::Relaxed);
                e.experience *= 2;
                Ok(())
            })
            .unwrap();
        bridge
            .register_external(|external: &ExternalDrop| {
                (external.kind == "ore").then(|| LocalDrop::new(external.experience))
            })
            .unwrap();

        let mut ore = ExternalDrop {
            experience: 1,
            kind: "ore",
            ..ExternalDrop::default()
        };
        assert!(!bridge.post_external(&mut ore));
        assert_eq!(ore.experience, 22);
        assert_eq!(bridge.bus().posts.load(Ordering::Relaxed), 1);
        assert_eq!(local_posts.load(Ordering::Relaxed), 1);

        let mut other = ExternalDrop {
            experience: 1,
            kind: "mob",
            ..ExternalDrop::default()
        };
        bridge.post_external(&mut other);
        assert_eq!(other.experience, 11);
        assert_eq!(bridge.bus().posts.load(Ordering::Relaxed), 2);
        assert_eq!(local_posts.load(Ordering::Relaxed), 1);
    }
}
