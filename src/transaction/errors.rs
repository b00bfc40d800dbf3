//! # Transaction Log Errors

use thiserror::Error;

/// Result type for transaction log operations
pub type TransactionResult<T> = Result<T, TransactionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The log was already handed to finalization once
    #[error("transaction log drained twice ({entries} entries at first drain)")]
    DoubleDrain { entries: usize },
}

impl TransactionError {
    pub fn code(&self) -> &'static str {
        match self {
            TransactionError::DoubleDrain { .. } => "CAUSEWAY_DOUBLE_DRAIN",
        }
    }

    pub fn is_fatal(&self) -> bool {
        true
    }
}
