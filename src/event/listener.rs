//! Listener registrations

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::ListenerResult;
use super::traits::{Event, EventType};
use crate::cause::Causal;

/// Identifier of an extension that owns listeners
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginId(pub String);

impl PluginId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Causal for PluginId {
    fn describe(&self) -> String {
        format!("plugin:{}", self.0)
    }
}

/// Handle to a single registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority presets. Lower runs earlier.
pub struct Order;

impl Order {
    pub const FIRST: i32 = -1000;
    pub const EARLY: i32 = -500;
    pub const DEFAULT: i32 = 0;
    pub const LATE: i32 = 500;
    pub const LAST: i32 = 1000;
}

/// How a listener is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Ascending; ties run in registration order
    pub priority: i32,
    /// Run in the tier that precedes external dispatch on a dual post
    pub before_modifications: bool,
    /// Do not invoke for an event that is already cancelled
    pub skip_cancelled: bool,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            priority: Order::DEFAULT,
            before_modifications: false,
            skip_cancelled: false,
        }
    }
}

impl ListenerOptions {
    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn before_modifications(mut self) -> Self {
        self.before_modifications = true;
        self
    }

    pub fn skip_cancelled(mut self) -> Self {
        self.skip_cancelled = true;
        self
    }
}

pub(crate) type ErasedCallback = Arc<dyn Fn(&mut dyn Event) -> ListenerResult + Send + Sync>;

/// A registration as stored by the manager
pub(crate) struct RegisteredListener {
    pub id: ListenerId,
    pub owner: PluginId,
    pub event_type: EventType,
    pub options: ListenerOptions,
    /// Registration order, breaks priority ties
    pub seq: u64,
    pub callback: ErasedCallback,
}

impl RegisteredListener {
    pub fn info(&self) -> ListenerInfo {
        ListenerInfo {
            id: self.id,
            owner: self.owner.clone(),
            event_type: self.event_type.name(),
            priority: self.options.priority,
            before_modifications: self.options.before_modifications,
            skip_cancelled: self.options.skip_cancelled,
        }
    }
}

/// Public description of a registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerInfo {
    pub id: ListenerId,
    pub owner: PluginId,
    pub event_type: &'static str,
    pub priority: i32,
    pub before_modifications: bool,
    pub skip_cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = ListenerOptions::priority(Order::EARLY)
            .before_modifications()
            .skip_cancelled();

        assert_eq!(options.priority, -500);
        assert!(options.before_modifications);
        assert!(options.skip_cancelled);
        assert_eq!(ListenerOptions::default().priority, Order::DEFAULT);
    }

    #[test]
    fn test_plugin_describes_itself() {
        assert_eq!(PluginId::new("worldguard").describe(), "plugin:worldguard");
    }
}
