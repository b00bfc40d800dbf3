//! Thread affinity check
//!
//! The cause stack and phase tracker are bound to the thread that built
//! them. Every mutating call runs `ThreadAffinity::check` first; a call
//! from any other thread is counted, logged and rejected before any state
//! is touched. This is detection only: nothing here synchronizes callers.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::observability::{LogEvent, Logger, PhaseObserver};

/// Rejected cross-thread mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalThreadAccess {
    /// Operation that was attempted
    pub operation: &'static str,
    /// Thread that attempted it
    pub caller: ThreadId,
    /// Thread the structure is bound to
    pub owner: ThreadId,
}

impl fmt::Display for IllegalThreadAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} called from {:?}, owner thread is {:?}",
            self.operation, self.caller, self.owner
        )
    }
}

impl std::error::Error for IllegalThreadAccess {}

/// Owner thread binding shared by the cause stack and the tracker
#[derive(Clone)]
pub struct ThreadAffinity {
    owner: ThreadId,
    owner_name: Option<String>,
    observer: Arc<dyn PhaseObserver>,
}

impl ThreadAffinity {
    /// Bind to the calling thread
    pub fn bind_current(observer: Arc<dyn PhaseObserver>) -> Self {
        let current = thread::current();
        Self {
            owner: current.id(),
            owner_name: current.name().map(str::to_string),
            observer,
        }
    }

    /// Thread this binding belongs to
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Observer that receives affinity violations
    pub fn observer(&self) -> &Arc<dyn PhaseObserver> {
        &self.observer
    }

    /// True when called on the owner thread. Never counts.
    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Reject the call unless it runs on the owner thread
    pub fn check(&self, operation: &'static str) -> Result<(), IllegalThreadAccess> {
        let caller = thread::current();
        if caller.id() == self.owner {
            return Ok(());
        }

        self.observer.illegal_thread_access(caller.id(), self.owner);

        let caller_desc = format!("{:?}", caller.id());
        let owner_desc = format!("{:?}", self.owner);
        Logger::event(
            LogEvent::IllegalThreadAccess,
            &[
                ("operation", operation),
                ("caller_thread", &caller_desc),
                ("caller_name", caller.name().unwrap_or("<unnamed>")),
                ("owner_thread", &owner_desc),
                ("owner_name", self.owner_name.as_deref().unwrap_or("<unnamed>")),
            ],
        );

        Err(IllegalThreadAccess {
            operation,
            caller: caller.id(),
            owner: self.owner,
        })
    }
}

impl fmt::Debug for ThreadAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadAffinity")
            .field("owner", &self.owner)
            .field("owner_name", &self.owner_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::TrackerMetrics;

    #[test]
    fn test_owner_thread_passes() {
        let metrics = Arc::new(TrackerMetrics::new());
        let affinity = ThreadAffinity::bind_current(metrics.clone());

        assert!(affinity.check("push_cause").is_ok());
        assert!(affinity.is_owner());
        assert_eq!(metrics.illegal_thread_accesses(), 0);
    }

    #[test]
    fn test_other_thread_is_rejected_and_counted() {
        let metrics = Arc::new(TrackerMetrics::new());
        let affinity = ThreadAffinity::bind_current(metrics.clone());
        let owner = affinity.owner();

        let err = thread::spawn(move || affinity.check("push_phase").unwrap_err())
            .join()
            .unwrap();

        assert_eq!(err.owner, owner);
        assert_ne!(err.caller, owner);
        assert_eq!(err.operation, "push_phase");
        assert_eq!(metrics.illegal_thread_accesses(), 1);
    }
}
