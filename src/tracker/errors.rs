//! # Phase Tracker Errors

use std::fmt;

use thiserror::Error;

use super::kind::PhaseKind;
use crate::affinity::IllegalThreadAccess;
use crate::cause::CauseError;
use crate::transaction::TransactionError;

/// Result type for phase tracker operations
pub type PhaseResult<T> = Result<T, PhaseError>;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Identifier of one pushed phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhaseId(pub(crate) u64);

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase#{}", self.0)
    }
}

/// Phase tracker errors
#[derive(Debug, Clone, Error)]
pub enum PhaseError {
    /// Pop with nothing on the phase stack
    #[error("{closing} popped with no open phase")]
    Underflow { closing: PhaseId },

    /// A phase was closed while another one was on top
    #[error("{closing} closed out of order ({top} {top_kind} is still open)")]
    Mismatch {
        closing: PhaseId,
        top: PhaseId,
        top_kind: PhaseKind,
    },

    /// The phase stack grew past the configured depth
    #[error("pushing {kind} would reach depth {depth}, limit is {limit}")]
    RunawayPhase {
        kind: PhaseKind,
        depth: usize,
        limit: usize,
    },

    #[error("transaction log: {0}")]
    Transaction(#[from] TransactionError),

    #[error("cause stack: {0}")]
    Cause(#[from] CauseError),

    /// Called from a thread other than the owner
    #[error("illegal thread access: {0}")]
    IllegalThread(#[from] IllegalThreadAccess),

    /// The phase's completion panicked; its frame was still closed
    #[error("completion of {phase} ({kind}) failed: {reason}")]
    CompletionFailed {
        phase: PhaseId,
        kind: PhaseKind,
        reason: String,
    },

    /// Internal error (poisoned lock)
    #[error("internal error: {0}")]
    Internal(String),
}

impl PhaseError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            PhaseError::Underflow { .. } => "CAUSEWAY_PHASE_UNDERFLOW",
            PhaseError::Mismatch { .. } => "CAUSEWAY_PHASE_MISMATCH",
            PhaseError::RunawayPhase { .. } => "CAUSEWAY_RUNAWAY_PHASE",
            PhaseError::Transaction(err) => err.code(),
            PhaseError::Cause(err) => err.code(),
            PhaseError::IllegalThread(_) => "CAUSEWAY_ILLEGAL_THREAD",
            PhaseError::CompletionFailed { .. } => "CAUSEWAY_COMPLETION_FAILED",
            PhaseError::Internal(_) => "CAUSEWAY_INTERNAL",
        }
    }

    /// Fatal errors mean the phase stack can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        match self {
            PhaseError::Underflow { .. }
            | PhaseError::Mismatch { .. }
            | PhaseError::RunawayPhase { .. }
            | PhaseError::Internal(_) => true,
            PhaseError::Transaction(err) => err.is_fatal(),
            PhaseError::Cause(err) => err.is_fatal(),
            PhaseError::IllegalThread(_) | PhaseError::CompletionFailed { .. } => false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("invalid config JSON: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CAUSEWAY_CONFIG_READ",
            ConfigError::Parse(_) => "CAUSEWAY_CONFIG_PARSE",
            ConfigError::Invalid(_) => "CAUSEWAY_CONFIG_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::FrameId;

    #[test]
    fn test_fatal_classification() {
        assert!(PhaseError::Underflow { closing: PhaseId(1) }.is_fatal());
        assert!(PhaseError::Transaction(TransactionError::DoubleDrain { entries: 0 }).is_fatal());
        assert!(!PhaseError::Cause(CauseError::EmptyCause).is_fatal());
        assert!(PhaseError::Cause(CauseError::MismatchedFrame {
            closing: FrameId(0),
            top: None
        })
        .is_fatal());
    }

    #[test]
    fn test_mismatch_message() {
        let err = PhaseError::Mismatch {
            closing: PhaseId(3),
            top: PhaseId(4),
            top_kind: PhaseKind::EntityTick,
        };
        assert_eq!(err.code(), "CAUSEWAY_PHASE_MISMATCH");
        assert_eq!(
            err.to_string(),
            "phase#3 closed out of order (phase#4 EntityTick is still open)"
        );
    }
}
