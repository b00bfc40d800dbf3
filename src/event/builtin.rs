//! Events fired when a phase is finalized
//!
//! Each carries the transactions of one capture kind, in capture order,
//! wrapped so listeners can veto them one at a time. Cancelling the event
//! vetoes all of them.

use serde::Serialize;

use super::traits::Event;
use crate::cause::Cause;
use crate::transaction::{BlockTransaction, SlotTransaction, SpawnTransaction};
use crate::world::{BlockPos, EntitySnapshot, SlotRef};

/// A transaction as seen by listeners
#[derive(Debug, Clone, PartialEq)]
pub struct EventTransaction<T> {
    transaction: T,
    valid: bool,
}

impl<T> EventTransaction<T> {
    pub fn new(transaction: T) -> Self {
        Self {
            transaction,
            valid: true,
        }
    }

    pub fn transaction(&self) -> &T {
        &self.transaction
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Veto this transaction; the host restores its original state
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

fn wrap<T>(transactions: Vec<T>) -> Vec<EventTransaction<T>> {
    transactions.into_iter().map(EventTransaction::new).collect()
}

/// Transactions the host must undo: all of them when cancelled, otherwise
/// the invalidated ones. Order is preserved.
fn rejected<T>(transactions: Vec<EventTransaction<T>>, cancelled: bool) -> Vec<T> {
    transactions
        .into_iter()
        .filter(|t| cancelled || !t.valid)
        .map(|t| t.transaction)
        .collect()
}

/// How a block transaction changed the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BlockChange {
    /// Replaced by air
    Break,
    /// Air replaced by a block
    Place,
    /// Anything else
    Modify,
}

impl BlockChange {
    pub fn classify(transaction: &BlockTransaction) -> Self {
        if transaction.replacement().is_air() && !transaction.original().is_air() {
            BlockChange::Break
        } else if transaction.original().is_air() && !transaction.replacement().is_air() {
            BlockChange::Place
        } else {
            BlockChange::Modify
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockChange::Break => "break",
            BlockChange::Place => "place",
            BlockChange::Modify => "modify",
        }
    }
}

/// Block changes of one classification
#[derive(Debug)]
pub struct ChangeBlockEvent {
    cause: Cause,
    change: BlockChange,
    transactions: Vec<EventTransaction<BlockTransaction>>,
    cancelled: bool,
}

impl ChangeBlockEvent {
    pub fn new(cause: Cause, change: BlockChange, transactions: Vec<BlockTransaction>) -> Self {
        Self {
            cause,
            change,
            transactions: wrap(transactions),
            cancelled: false,
        }
    }

    pub fn change(&self) -> BlockChange {
        self.change
    }

    pub fn transactions(&self) -> &[EventTransaction<BlockTransaction>] {
        &self.transactions
    }

    pub fn transactions_mut(&mut self) -> &mut [EventTransaction<BlockTransaction>] {
        &mut self.transactions
    }

    /// Invalidate every transaction at positions matching `predicate`;
    /// returns how many were invalidated
    pub fn invalidate_where<F: Fn(&BlockPos) -> bool>(&mut self, predicate: F) -> usize {
        let mut count = 0;
        for tx in self.transactions.iter_mut() {
            if tx.valid && predicate(tx.transaction.target()) {
                tx.invalidate();
                count += 1;
            }
        }
        count
    }

    pub fn into_rejected(self) -> Vec<BlockTransaction> {
        rejected(self.transactions, self.cancelled)
    }
}

impl Event for ChangeBlockEvent {
    fn cause(&self) -> &Cause {
        &self.cause
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Every slot change of one phase
#[derive(Debug)]
pub struct ChangeInventoryEvent {
    cause: Cause,
    transactions: Vec<EventTransaction<SlotTransaction>>,
    cancelled: bool,
}

impl ChangeInventoryEvent {
    pub fn new(cause: Cause, transactions: Vec<SlotTransaction>) -> Self {
        Self {
            cause,
            transactions: wrap(transactions),
            cancelled: false,
        }
    }

    pub fn transactions(&self) -> &[EventTransaction<SlotTransaction>] {
        &self.transactions
    }

    pub fn transactions_mut(&mut self) -> &mut [EventTransaction<SlotTransaction>] {
        &mut self.transactions
    }

    /// Slots touched, in capture order
    pub fn slots(&self) -> impl Iterator<Item = &SlotRef> + '_ {
        self.transactions.iter().map(|t| t.transaction.target())
    }

    pub fn into_rejected(self) -> Vec<SlotTransaction> {
        rejected(self.transactions, self.cancelled)
    }
}

impl Event for ChangeInventoryEvent {
    fn cause(&self) -> &Cause {
        &self.cause
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}

/// Every entity spawned during one phase
#[derive(Debug)]
pub struct SpawnEntityEvent {
    cause: Cause,
    transactions: Vec<EventTransaction<SpawnTransaction>>,
    cancelled: bool,
}

impl SpawnEntityEvent {
    pub fn new(cause: Cause, transactions: Vec<SpawnTransaction>) -> Self {
        Self {
            cause,
            transactions: wrap(transactions),
            cancelled: false,
        }
    }

    pub fn transactions(&self) -> &[EventTransaction<SpawnTransaction>] {
        &self.transactions
    }

    pub fn transactions_mut(&mut self) -> &mut [EventTransaction<SpawnTransaction>] {
        &mut self.transactions
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySnapshot> + '_ {
        self.transactions
            .iter()
            .filter_map(|t| t.transaction.entity())
    }

    /// Veto spawns of the given entity type; returns how many
    pub fn invalidate_type(&mut self, entity_type: &str) -> usize {
        let mut count = 0;
        for tx in self.transactions.iter_mut() {
            let matches = tx
                .transaction
                .entity()
                .map(|e| e.entity_type == entity_type)
                .unwrap_or(false);
            if tx.valid && matches {
                tx.invalidate();
                count += 1;
            }
        }
        count
    }

    pub fn into_rejected(self) -> Vec<SpawnTransaction> {
        rejected(self.transactions, self.cancelled)
    }
}

impl Event for SpawnEntityEvent {
    fn cause(&self) -> &Cause {
        &self.cause
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }
}
