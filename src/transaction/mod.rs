//! Transactions
//!
//! Capture calls append immutable transactions to the active phase's log.
//! When the phase pops, the log is drained once and finalized into events.

mod errors;
pub mod finalize;
mod log;
mod record;

pub use errors::{TransactionError, TransactionResult};
pub use finalize::{post_drained, PhaseOutcome};
pub use log::{DrainedTransactions, TransactionLog};
pub use record::{
    BlockTransaction, CaptureKind, CapturedTransaction, SlotTransaction, SpawnTransaction, Transaction,
};
