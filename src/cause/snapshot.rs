//! Immutable cause snapshots handed to events

use std::fmt;
use std::sync::Arc;

use super::context::Context;
use super::object::{Causal, CauseHandle};

/// Ordered causal objects (oldest first, newest last) plus their context.
///
/// A `Cause` never aliases the live stack: it stays valid after the frame
/// that built it has closed.
#[derive(Clone)]
pub struct Cause {
    objects: Arc<[CauseHandle]>,
    context: Context,
}

impl Cause {
    pub(crate) fn from_parts(objects: Arc<[CauseHandle]>, context: Context) -> Self {
        Self { objects, context }
    }

    /// Build a cause directly, oldest object first
    pub fn of(objects: Vec<CauseHandle>) -> Self {
        Self {
            objects: objects.into(),
            context: Context::new(),
        }
    }

    /// The newest object, i.e. the most immediate cause
    pub fn newest(&self) -> Option<&CauseHandle> {
        self.objects.last()
    }

    /// Newest object of concrete type `T`
    pub fn first<T: Causal>(&self) -> Option<&T> {
        self.objects.iter().rev().find_map(|h| h.downcast_ref::<T>())
    }

    /// Every object of type `T`, newest first
    pub fn all_of<T: Causal>(&self) -> Vec<&T> {
        self.objects
            .iter()
            .rev()
            .filter_map(|h| h.downcast_ref::<T>())
            .collect()
    }

    pub fn contains(&self, handle: &CauseHandle) -> bool {
        self.objects.iter().any(|h| h.ptr_eq(handle))
    }

    /// Objects in push order, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &CauseHandle> + '_ {
        self.objects.iter()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        self.objects.len() == other.objects.len()
            && self
                .objects
                .iter()
                .zip(other.objects.iter())
                .all(|(a, b)| a.ptr_eq(b))
            && self.context == other.context
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cause")
            .field("objects", &self.objects)
            .field("context", &self.context)
            .finish()
    }
}
