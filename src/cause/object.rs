//! Causal objects
//!
//! Anything can be responsible for a mutation: a player, a ticking block,
//! a plugin, the game itself. The cause stack stores them type-erased
//! behind `CauseHandle`, shared by `Arc` and never cloned.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::world::{BlockSnapshot, EntitySnapshot};

/// Downcasting support shared by causal objects and events
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// An object that can appear in a cause.
///
/// Listeners only ever need two things from a cause entry: a description
/// for logs and a way to ask "is this a `T`?".
pub trait Causal: AsAny + Send + Sync + fmt::Debug {
    /// Short human readable description
    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

/// Shared handle to a causal object.
///
/// Equality is identity: two handles are equal only when they point at the
/// same allocation.
#[derive(Clone)]
pub struct CauseHandle(Arc<dyn Causal>);

impl CauseHandle {
    /// Wrap a value
    pub fn new<T: Causal>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Share an existing allocation
    pub fn from_arc<T: Causal>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Borrow the object as `T` if that is its concrete type
    pub fn downcast_ref<T: Causal>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref::<T>()
    }

    /// True if the object is a `T`
    pub fn is<T: Causal>(&self) -> bool {
        (*self.0).as_any().is::<T>()
    }

    /// Description of the object
    pub fn describe(&self) -> String {
        (*self.0).describe()
    }

    /// Rust type name of the object
    pub fn type_name(&self) -> &'static str {
        (*self.0).type_name()
    }

    /// True if both handles share one allocation
    pub fn ptr_eq(&self, other: &CauseHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for CauseHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for CauseHandle {}

impl fmt::Debug for CauseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Root of every cause the tracker builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRoot {
    pub name: String,
}

impl GameRoot {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Causal for GameRoot {
    fn describe(&self) -> String {
        format!("game:{}", self.name)
    }
}

impl Causal for EntitySnapshot {
    fn describe(&self) -> String {
        format!("entity:{}:{}", self.entity_type, self.id.0)
    }
}

impl Causal for BlockSnapshot {
    fn describe(&self) -> String {
        format!("block:{}@{}", self.state, self.pos)
    }
}
