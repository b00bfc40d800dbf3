//! The `Event` trait
//!
//! Events carry the cause they were fired with and, when they can be
//! cancelled, a cancellation flag. Listeners get them by `&mut` and may
//! change anything the event type exposes.

use std::any::{type_name, TypeId};
use std::fmt;

use crate::cause::{AsAny, Cause};

/// An event that can be posted through an `EventManager`
pub trait Event: AsAny {
    /// Cause the event was fired with
    fn cause(&self) -> &Cause;

    /// Current cancellation state. Events that cannot be cancelled keep the
    /// default.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Set the cancellation state. No-op for events that cannot be cancelled.
    fn set_cancelled(&mut self, _cancelled: bool) {}

    /// When true, a cancelled event is not delivered to the remaining
    /// listeners. By default every listener runs regardless.
    fn suppress_on_cancel(&self) -> bool {
        false
    }
}

/// Runtime identity of an event type, used to key listener lists
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
}

impl EventType {
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: short_name(type_name::<E>()),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name without its module path
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn short_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    let start = base.rfind("::").map(|i| i + 2).unwrap_or(0);
    &full[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("causeway::event::builtin::ChangeBlockEvent"), "ChangeBlockEvent");
        assert_eq!(short_name("Plain"), "Plain");
        assert_eq!(short_name("a::Wrapper<b::Inner>"), "Wrapper<b::Inner>");
    }
}
