//! # Cause Stack Errors

use std::fmt;

use thiserror::Error;

use crate::affinity::IllegalThreadAccess;

/// Result type for cause stack operations
pub type CauseResult<T> = Result<T, CauseError>;

/// Identifier of one pushed cause frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Cause stack errors
#[derive(Debug, Clone, Error)]
pub enum CauseError {
    /// A frame was closed while a later frame was still open
    #[error("{closing} closed out of order (innermost open frame: {})", display_top(.top))]
    MismatchedFrame {
        closing: FrameId,
        top: Option<FrameId>,
    },

    /// `current_cause` with nothing on the stack
    #[error("cause stack is empty")]
    EmptyCause,

    /// Context written with no open frame and no root
    #[error("no open cause frame and no root cause to attach context to")]
    NoActiveFrame,

    /// `pop_cause` would cross the checkpoint of the innermost frame
    #[error("cannot pop cause below the checkpoint of {frame} (length {floor})")]
    PopBelowFrame { frame: FrameId, floor: usize },

    /// `pop_cause` would remove the pinned root
    #[error("cannot pop the pinned root cause")]
    PopRoot,

    /// Called from a thread other than the owner
    #[error("illegal thread access: {0}")]
    IllegalThread(#[from] IllegalThreadAccess),

    /// Internal error (poisoned lock)
    #[error("internal error: {0}")]
    Internal(String),
}

fn display_top(top: &Option<FrameId>) -> String {
    match top {
        Some(id) => id.to_string(),
        None => "none".to_string(),
    }
}

impl CauseError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CauseError::MismatchedFrame { .. } => "CAUSEWAY_FRAME_MISMATCH",
            CauseError::EmptyCause => "CAUSEWAY_EMPTY_CAUSE",
            CauseError::NoActiveFrame => "CAUSEWAY_NO_ACTIVE_FRAME",
            CauseError::PopBelowFrame { .. } => "CAUSEWAY_POP_BELOW_FRAME",
            CauseError::PopRoot => "CAUSEWAY_POP_ROOT",
            CauseError::IllegalThread(_) => "CAUSEWAY_ILLEGAL_THREAD",
            CauseError::Internal(_) => "CAUSEWAY_INTERNAL",
        }
    }

    /// Fatal errors mean the frame stack can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CauseError::MismatchedFrame { .. } | CauseError::Internal(_)
        )
    }
}
