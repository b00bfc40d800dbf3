//! Baked listener lists
//!
//! Built lazily on the first post of an event type and dropped whenever a
//! registration for that type changes. A bake is immutable once built;
//! posting clones its `Arc` and releases the lock before any listener runs.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::errors::{EventError, EventResult};
use super::listener::RegisteredListener;

/// Listeners of one event type, split by tier and sorted for dispatch
#[derive(Default)]
pub(crate) struct ListenerBake {
    pub before: Vec<Arc<RegisteredListener>>,
    pub after: Vec<Arc<RegisteredListener>>,
}

impl ListenerBake {
    pub fn build(listeners: &[Arc<RegisteredListener>]) -> Self {
        let mut sorted: Vec<Arc<RegisteredListener>> = listeners.to_vec();
        sorted.sort_by_key(|l| (l.options.priority, l.seq));

        let (before, after) = sorted
            .into_iter()
            .partition(|l| l.options.before_modifications);
        Self { before, after }
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }
}

#[derive(Default)]
pub(crate) struct ListenerCache {
    bakes: RwLock<HashMap<TypeId, Arc<ListenerBake>>>,
}

impl ListenerCache {
    pub fn get(&self, ty: TypeId) -> EventResult<Option<Arc<ListenerBake>>> {
        let bakes = self
            .bakes
            .read()
            .map_err(|_| EventError::Internal("listener cache lock poisoned".into()))?;
        Ok(bakes.get(&ty).cloned())
    }

    pub fn store(&self, ty: TypeId, bake: Arc<ListenerBake>) -> EventResult<()> {
        let mut bakes = self
            .bakes
            .write()
            .map_err(|_| EventError::Internal("listener cache lock poisoned".into()))?;
        bakes.insert(ty, bake);
        Ok(())
    }

    pub fn invalidate(&self, ty: TypeId) -> EventResult<()> {
        let mut bakes = self
            .bakes
            .write()
            .map_err(|_| EventError::Internal("listener cache lock poisoned".into()))?;
        bakes.remove(&ty);
        Ok(())
    }
}
