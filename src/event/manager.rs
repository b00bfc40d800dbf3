//! # Event Manager
//!
//! Registers typed listeners and dispatches events to them.
//!
//! Dispatch order is ascending priority, ties in registration order. A
//! listener that returns an error or panics is logged with its owner and the
//! event type, counted, and skipped over; the remaining listeners still
//! run. Any cancellation change made by a failed listener is discarded.
//!
//! Registration may happen from any thread (and from inside a listener).
//! Posting never holds a registry lock while a listener runs.

use std::any::TypeId;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::cache::{ListenerBake, ListenerCache};
use super::errors::{EventError, EventResult, ListenerError, ListenerResult};
use super::listener::{
    ErasedCallback, ListenerId, ListenerInfo, ListenerOptions, PluginId, RegisteredListener,
};
use super::traits::{Event, EventType};
use crate::observability::{panic_message, LogEvent, Logger, PhaseObserver};

type Registry = HashMap<TypeId, Vec<Arc<RegisteredListener>>>;

/// Typed listener registry and dispatcher
pub struct EventManager {
    registry: RwLock<Registry>,
    cache: ListenerCache,
    observer: Arc<dyn PhaseObserver>,
    next_seq: AtomicU64,
}

impl EventManager {
    pub fn new(observer: Arc<dyn PhaseObserver>) -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            cache: ListenerCache::default(),
            observer,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn observer(&self) -> &Arc<dyn PhaseObserver> {
        &self.observer
    }

    fn read_registry(&self) -> EventResult<std::sync::RwLockReadGuard<'_, Registry>> {
        self.registry
            .read()
            .map_err(|_| EventError::Internal("listener registry lock poisoned".into()))
    }

    fn write_registry(&self) -> EventResult<std::sync::RwLockWriteGuard<'_, Registry>> {
        self.registry
            .write()
            .map_err(|_| EventError::Internal("listener registry lock poisoned".into()))
    }

    /// Register a listener for `E` at the given priority
    pub fn register<E, F>(&self, owner: &PluginId, priority: i32, callback: F) -> EventResult<ListenerId>
    where
        E: Event,
        F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
    {
        self.register_with(owner, ListenerOptions::priority(priority), callback)
    }

    /// Register a listener for `E` with explicit options
    pub fn register_with<E, F>(
        &self,
        owner: &PluginId,
        options: ListenerOptions,
        callback: F,
    ) -> EventResult<ListenerId>
    where
        E: Event,
        F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
    {
        let event_type = EventType::of::<E>();
        let erased: ErasedCallback = Arc::new(move |event: &mut dyn Event| {
            let actual = (*event).type_name();
            match (*event).as_any_mut().downcast_mut::<E>() {
                Some(event) => callback(event),
                None => Err(ListenerError::TypeMismatch {
                    expected: event_type.name(),
                    actual,
                }),
            }
        });

        let listener = Arc::new(RegisteredListener {
            id: ListenerId::generate(),
            owner: owner.clone(),
            event_type,
            options,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            callback: erased,
        });
        let id = listener.id;

        {
            let mut registry = self.write_registry()?;
            registry.entry(event_type.id()).or_default().push(listener);
            self.cache.invalidate(event_type.id())?;
        }

        let priority = options.priority.to_string();
        let listener_id = id.to_string();
        Logger::event(
            LogEvent::ListenerRegistered,
            &[
                ("owner", owner.as_str()),
                ("event_type", event_type.name()),
                ("priority", &priority),
                ("listener_id", &listener_id),
            ],
        );

        Ok(id)
    }

    /// Remove every registration owned by `owner`; returns how many went
    pub fn unregister(&self, owner: &PluginId) -> EventResult<usize> {
        let mut removed = 0;
        {
            let mut registry = self.write_registry()?;
            for (ty, listeners) in registry.iter_mut() {
                let before = listeners.len();
                listeners.retain(|l| &l.owner != owner);
                if listeners.len() != before {
                    removed += before - listeners.len();
                    self.cache.invalidate(*ty)?;
                }
            }
            registry.retain(|_, listeners| !listeners.is_empty());
        }

        let count = removed.to_string();
        Logger::event(
            LogEvent::ListenersUnregistered,
            &[("owner", owner.as_str()), ("count", &count)],
        );
        Ok(removed)
    }

    /// Remove a single registration; returns false if it was already gone
    pub fn unregister_listener(&self, id: ListenerId) -> EventResult<bool> {
        let mut registry = self.write_registry()?;
        let mut found = None;
        for (ty, listeners) in registry.iter_mut() {
            if let Some(index) = listeners.iter().position(|l| l.id == id) {
                listeners.remove(index);
                found = Some(*ty);
                break;
            }
        }
        match found {
            Some(ty) => {
                self.cache.invalidate(ty)?;
                registry.retain(|_, listeners| !listeners.is_empty());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Dispatch `event` to every listener, before tier first.
    ///
    /// Returns the final cancellation state.
    pub fn post<E: Event>(&self, event: &mut E) -> bool {
        let event_type = EventType::of::<E>();
        let bake = self.bake_for(event_type);
        self.run_tier(event, event_type, &bake.before);
        self.run_tier(event, event_type, &bake.after);
        self.finish(event, event_type)
    }

    pub(crate) fn finish<E: Event>(&self, event: &E, event_type: EventType) -> bool {
        let cancelled = event.is_cancelled();
        self.observer.event_posted(event_type.name(), cancelled);
        cancelled
    }

    /// Baked listener list for a type, building it on a miss.
    ///
    /// A poisoned lock yields an empty bake: dispatch degrades to no
    /// listeners instead of taking down the tick thread.
    pub(crate) fn bake_for(&self, event_type: EventType) -> Arc<ListenerBake> {
        match self.try_bake_for(event_type) {
            Ok(bake) => bake,
            Err(err) => {
                self.observer.fatal(err.code());
                Logger::fatal(
                    err.code(),
                    &[("event_type", event_type.name()), ("reason", &err.to_string())],
                );
                Arc::new(ListenerBake::default())
            }
        }
    }

    fn try_bake_for(&self, event_type: EventType) -> EventResult<Arc<ListenerBake>> {
        if let Some(bake) = self.cache.get(event_type.id())? {
            return Ok(bake);
        }
        // Built and stored under the registry read lock so a concurrent
        // registration cannot be lost between the two.
        let registry = self.read_registry()?;
        let bake = Arc::new(
            registry
                .get(&event_type.id())
                .map(|listeners| ListenerBake::build(listeners))
                .unwrap_or_default(),
        );
        self.cache.store(event_type.id(), Arc::clone(&bake))?;
        Ok(bake)
    }

    /// Invoke one tier of listeners in order
    pub(crate) fn run_tier<E: Event>(
        &self,
        event: &mut E,
        event_type: EventType,
        tier: &[Arc<RegisteredListener>],
    ) {
        for listener in tier {
            let cancelled = event.is_cancelled();
            if cancelled && event.suppress_on_cancel() {
                return;
            }
            if cancelled && listener.options.skip_cancelled {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                (listener.callback)(&mut *event)
            }));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err),
                Err(payload) => Some(ListenerError::Panicked(panic_message(payload.as_ref()))),
            };

            if let Some(err) = failure {
                event.set_cancelled(cancelled);
                self.report_failure(listener, event_type, &err);
            }
        }
    }

    fn report_failure(&self, listener: &RegisteredListener, event_type: EventType, err: &ListenerError) {
        self.observer
            .listener_failed(listener.owner.as_str(), event_type.name());
        let listener_id = listener.id.to_string();
        let reason = err.to_string();
        Logger::event(
            LogEvent::ListenerFailed,
            &[
                ("owner", listener.owner.as_str()),
                ("event_type", event_type.name()),
                ("listener_id", &listener_id),
                ("code", err.code()),
                ("reason", &reason),
            ],
        );
    }

    /// Number of listeners registered for `E`
    pub fn listener_count<E: Event>(&self) -> usize {
        self.bake_for(EventType::of::<E>()).len()
    }

    pub fn has_listeners<E: Event>(&self) -> bool {
        self.listener_count::<E>() > 0
    }

    /// Every registration, grouped by event type in dispatch order
    pub fn registrations(&self) -> EventResult<Vec<ListenerInfo>> {
        let registry = self.read_registry()?;
        let mut infos: Vec<ListenerInfo> = Vec::new();
        for listeners in registry.values() {
            let bake = ListenerBake::build(listeners);
            infos.extend(bake.before.iter().chain(bake.after.iter()).map(|l| l.info()));
        }
        infos.sort_by(|a, b| a.event_type.cmp(b.event_type));
        Ok(infos)
    }
}
