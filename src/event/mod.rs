//! Event dispatch
//!
//! `EventManager` holds typed listeners per event type and posts events to
//! them in priority order. The built-in events are what a phase's captured
//! transactions turn into when the phase is popped.

mod builtin;
mod cache;
mod errors;
mod listener;
mod manager;
mod traits;

pub use builtin::{BlockChange, ChangeBlockEvent, ChangeInventoryEvent, EventTransaction, SpawnEntityEvent};
pub use errors::{EventError, EventResult, ListenerError, ListenerResult};
pub use listener::{ListenerId, ListenerInfo, ListenerOptions, Order, PluginId};
pub use manager::EventManager;
pub use traits::{Event, EventType};
