//! Turning a drained log into events
//!
//! Blocks become up to three `ChangeBlockEvent`s (break, then place, then
//! modify), slots one `ChangeInventoryEvent`, spawns one `SpawnEntityEvent`.
//! Each event keeps capture order. Whatever listeners reject is collected
//! into a `PhaseOutcome` for the host to restore.

use super::log::DrainedTransactions;
use super::record::{BlockTransaction, SlotTransaction, SpawnTransaction};
use crate::cause::Cause;
use crate::event::{BlockChange, ChangeBlockEvent, ChangeInventoryEvent, EventManager, SpawnEntityEvent};

/// Block events in posting order, empty classes skipped
pub fn block_events(cause: &Cause, blocks: Vec<BlockTransaction>) -> Vec<ChangeBlockEvent> {
    let mut breaks = Vec::new();
    let mut places = Vec::new();
    let mut modifies = Vec::new();
    for tx in blocks {
        match BlockChange::classify(&tx) {
            BlockChange::Break => breaks.push(tx),
            BlockChange::Place => places.push(tx),
            BlockChange::Modify => modifies.push(tx),
        }
    }

    [
        (BlockChange::Break, breaks),
        (BlockChange::Place, places),
        (BlockChange::Modify, modifies),
    ]
    .into_iter()
    .filter(|(_, txs)| !txs.is_empty())
    .map(|(change, txs)| ChangeBlockEvent::new(cause.clone(), change, txs))
    .collect()
}

pub fn inventory_event(cause: &Cause, slots: Vec<SlotTransaction>) -> Option<ChangeInventoryEvent> {
    if slots.is_empty() {
        return None;
    }
    Some(ChangeInventoryEvent::new(cause.clone(), slots))
}

pub fn spawn_event(cause: &Cause, spawns: Vec<SpawnTransaction>) -> Option<SpawnEntityEvent> {
    if spawns.is_empty() {
        return None;
    }
    Some(SpawnEntityEvent::new(cause.clone(), spawns))
}

/// What happened to a phase's transactions after posting
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PhaseOutcome {
    pub events_posted: usize,
    pub events_cancelled: usize,
    /// Block changes the host must revert, in capture order per class
    pub rejected_blocks: Vec<BlockTransaction>,
    pub rejected_slots: Vec<SlotTransaction>,
    pub rejected_spawns: Vec<SpawnTransaction>,
}

impl PhaseOutcome {
    pub fn has_rejections(&self) -> bool {
        !self.rejected_blocks.is_empty()
            || !self.rejected_slots.is_empty()
            || !self.rejected_spawns.is_empty()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected_blocks.len() + self.rejected_slots.len() + self.rejected_spawns.len()
    }

    fn record(&mut self, cancelled: bool) {
        self.events_posted += 1;
        if cancelled {
            self.events_cancelled += 1;
        }
    }
}

/// Build and post every event for a drained log
pub fn post_drained(events: &EventManager, cause: &Cause, drained: DrainedTransactions) -> PhaseOutcome {
    let mut outcome = PhaseOutcome::default();
    let DrainedTransactions {
        blocks,
        slots,
        spawns,
    } = drained;

    for mut event in block_events(cause, blocks) {
        outcome.record(events.post(&mut event));
        outcome.rejected_blocks.extend(event.into_rejected());
    }
    if let Some(mut event) = inventory_event(cause, slots) {
        outcome.record(events.post(&mut event));
        outcome.rejected_slots.extend(event.into_rejected());
    }
    if let Some(mut event) = spawn_event(cause, spawns) {
        outcome.record(events.post(&mut event));
        outcome.rejected_spawns.extend(event.into_rejected());
    }
    outcome
}
