//! # Event Dispatch Errors

use thiserror::Error;

/// Result type for event manager operations
pub type EventResult<T> = Result<T, EventError>;

/// Result type returned by listener callbacks
pub type ListenerResult = Result<(), ListenerError>;

/// Failure reported by a single listener.
///
/// Never propagates out of `post`: the manager logs it, counts it and moves
/// on to the next listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    /// The listener rejected the event
    #[error("listener failed: {0}")]
    Failed(String),

    /// The listener panicked; the payload message if it had one
    #[error("listener panicked: {0}")]
    Panicked(String),

    /// The erased callback was handed an event of another type
    #[error("listener registered for {expected} received {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

impl ListenerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ListenerError::Failed(reason.into())
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ListenerError::Failed(_) => "CAUSEWAY_LISTENER_FAILED",
            ListenerError::Panicked(_) => "CAUSEWAY_LISTENER_PANICKED",
            ListenerError::TypeMismatch { .. } => "CAUSEWAY_LISTENER_TYPE_MISMATCH",
        }
    }

    /// Listener failures are isolated and never fatal
    pub fn is_fatal(&self) -> bool {
        false
    }
}

/// Event manager errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// Internal error (poisoned registry lock)
    #[error("internal error: {0}")]
    Internal(String),
}

impl EventError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EventError::Internal(_) => "CAUSEWAY_INTERNAL",
        }
    }

    pub fn is_fatal(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_errors_are_not_fatal() {
        let err = ListenerError::failed("bad slot");
        assert!(!err.is_fatal());
        assert_eq!(err.code(), "CAUSEWAY_LISTENER_FAILED");
        assert_eq!(err.to_string(), "listener failed: bad slot");
    }

    #[test]
    fn test_panic_code() {
        let err = ListenerError::Panicked("boom".into());
        assert_eq!(err.code(), "CAUSEWAY_LISTENER_PANICKED");
    }
}
