//! # Dual-Bus Bridge Errors

use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// A field of an external event could not be copied into the local event.
///
/// The local field keeps its pre-sync value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The external value is not representable locally
    #[error("field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The external event is not the shape this local event syncs with
    #[error("unsupported external event: {0}")]
    Unsupported(String),
}

impl SyncError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SyncError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SyncError::InvalidField { .. } => "CAUSEWAY_SYNC_INVALID_FIELD",
            SyncError::Unsupported(_) => "CAUSEWAY_SYNC_UNSUPPORTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Internal error (poisoned adapter lock)
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Internal(_) => "CAUSEWAY_INTERNAL",
        }
    }
}
