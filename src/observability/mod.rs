//! Observability for the cause stack, phase tracker and event buses
//!
//! This module provides:
//! - Structured logging (one JSON object per line)
//! - The `PhaseObserver` callback interface
//! - `TrackerMetrics`, an atomic counter implementation of it
//!
//! # Principles
//!
//! 1. Observability never changes the outcome of a phase or a post
//! 2. Logging failures are swallowed
//! 3. Counters are exact; log lines may be rate limited
//!
//! # Usage
//!
//! ```ignore
//! use causeway::observability::{Logger, LogEvent, TrackerMetrics};
//!
//! Logger::event(LogEvent::CaptureMissed, &[("kind", "slot")]);
//!
//! let metrics = Arc::new(TrackerMetrics::new());
//! let tracker = PhaseTracker::new(TrackerConfig::default(), metrics.clone());
//! ```

use std::any::Any;

mod events;
mod hooks;
mod logger;
mod metrics;

pub use events::LogEvent;
pub use hooks::{NoopObserver, PhaseObserver};
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, TrackerMetrics};

/// Message carried by a caught panic payload, for logging
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("listener {} broke", 3)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "listener 3 broke");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
