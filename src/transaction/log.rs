//! Per-phase transaction log
//!
//! Append-only while its phase is open, drained exactly once when the phase
//! is popped. Draining groups entries by kind and keeps capture order within
//! each group.

use super::errors::{TransactionError, TransactionResult};
use super::record::{
    BlockTransaction, CaptureKind, CapturedTransaction, SlotTransaction, SpawnTransaction,
};

#[derive(Debug, Default)]
pub struct TransactionLog {
    entries: Vec<CapturedTransaction>,
    drained: Option<usize>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, transaction: CapturedTransaction) {
        self.entries.push(transaction);
    }

    /// Entries in capture order
    pub fn iter(&self) -> impl Iterator<Item = &CapturedTransaction> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: CaptureKind) -> usize {
        self.entries.iter().filter(|t| t.kind() == kind).count()
    }

    pub fn is_drained(&self) -> bool {
        self.drained.is_some()
    }

    /// Hand every entry over for finalization. A second call is an error.
    pub fn drain(&mut self) -> TransactionResult<DrainedTransactions> {
        if let Some(entries) = self.drained {
            return Err(TransactionError::DoubleDrain { entries });
        }
        self.drained = Some(self.entries.len());

        let mut drained = DrainedTransactions::default();
        for entry in self.entries.drain(..) {
            match entry {
                CapturedTransaction::Block(tx) => drained.blocks.push(tx),
                CapturedTransaction::Slot(tx) => drained.slots.push(tx),
                CapturedTransaction::EntitySpawn(tx) => drained.spawns.push(tx),
            }
        }
        Ok(drained)
    }
}

/// A drained log, grouped by capture kind
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DrainedTransactions {
    pub blocks: Vec<BlockTransaction>,
    pub slots: Vec<SlotTransaction>,
    pub spawns: Vec<SpawnTransaction>,
}

impl DrainedTransactions {
    pub fn len(&self) -> usize {
        self.blocks.len() + self.slots.len() + self.spawns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
