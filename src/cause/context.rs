//! Cause context
//!
//! Keyed auxiliary facts that travel with a cause but are not part of its
//! causal order: which plugin asked for the change, which tick it is.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::event::PluginId;
use crate::world::{EntityId, WorldId};

/// Typed context key. The name is the identity; `T` is the value type.
pub struct ContextKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ContextKey<T> {}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey({})", self.name)
    }
}

/// Well-known context keys
pub mod keys {
    use super::*;

    /// Plugin that requested the change
    pub const PLUGIN: ContextKey<PluginId> = ContextKey::new("plugin");
    /// Tick number the change happened in
    pub const TICK: ContextKey<u64> = ContextKey::new("tick");
    /// Player whose action triggered the change
    pub const PLAYER: ContextKey<EntityId> = ContextKey::new("player");
    /// World the change happened in
    pub const WORLD: ContextKey<WorldId> = ContextKey::new("world");
}

#[derive(Clone)]
struct ContextValue(Arc<dyn Any + Send + Sync>);

/// Mapping from context keys to values. One value per key.
#[derive(Clone, Default)]
pub struct Context {
    entries: BTreeMap<&'static str, ContextValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, if present and of type `T`
    pub fn get<T: Any>(&self, key: &ContextKey<T>) -> Option<&T> {
        self.entries
            .get(key.name)
            .and_then(|v| v.0.downcast_ref::<T>())
    }

    pub fn contains<T>(&self, key: &ContextKey<T>) -> bool {
        self.entries.contains_key(key.name)
    }

    /// Set a value; returns true if an earlier value was replaced
    pub(crate) fn insert<T: Any + Send + Sync>(&mut self, key: &ContextKey<T>, value: T) -> bool {
        self.entries
            .insert(key.name, ContextValue(Arc::new(value)))
            .is_some()
    }

    pub(crate) fn remove<T>(&mut self, key: &ContextKey<T>) -> bool {
        self.entries.remove(key.name).is_some()
    }

    /// Key names in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && Arc::ptr_eq(&va.0, &vb.0))
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPTH: ContextKey<u32> = ContextKey::new("depth");

    #[test]
    fn test_insert_and_get() {
        let mut ctx = Context::new();
        assert!(!ctx.insert(&keys::TICK, 42));

        assert_eq!(ctx.get(&keys::TICK), Some(&42));
        assert!(ctx.contains(&keys::TICK));
        assert!(!ctx.contains(&DEPTH));
    }

    #[test]
    fn test_later_insert_overwrites() {
        let mut ctx = Context::new();
        ctx.insert(&DEPTH, 1);
        assert!(ctx.insert(&DEPTH, 2));

        assert_eq!(ctx.get(&DEPTH), Some(&2));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_clone_is_equal_until_modified() {
        let mut ctx = Context::new();
        ctx.insert(&DEPTH, 1);
        let snapshot = ctx.clone();
        assert_eq!(ctx, snapshot);

        ctx.insert(&DEPTH, 1);
        assert_ne!(ctx, snapshot);
    }

    #[test]
    fn test_wrong_type_is_none() {
        let mut ctx = Context::new();
        ctx.insert(&DEPTH, 7);
        let same_name_other_type: ContextKey<String> = ContextKey::new("depth");
        assert!(ctx.get(&same_name_other_type).is_none());
    }
}
