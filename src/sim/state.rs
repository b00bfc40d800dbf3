//! In-memory world state
//!
//! Every mutator records its transaction through the tracker before
//! touching state, so a rejected capture (wrong thread) changes nothing.

use std::collections::BTreeMap;

use crate::tracker::{Capture, PhaseResult, PhaseTracker};
use crate::transaction::PhaseOutcome;
use crate::world::{BlockPos, BlockState, EntityId, EntitySnapshot, InventoryId, ItemStack, SlotRef, WorldId};

#[derive(Debug, Default)]
pub struct WorldState {
    id: WorldId,
    blocks: BTreeMap<BlockPos, BlockState>,
    inventories: BTreeMap<InventoryId, Vec<ItemStack>>,
    entities: BTreeMap<EntityId, EntitySnapshot>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn pos(&self, x: i32, y: i32, z: i32) -> BlockPos {
        BlockPos::new(self.id, x, y, z)
    }

    /// Block at `pos`; air where nothing was placed
    pub fn block(&self, pos: &BlockPos) -> BlockState {
        self.blocks.get(pos).cloned().unwrap_or_else(BlockState::air)
    }

    /// Non-air blocks in position order
    pub fn blocks(&self) -> impl Iterator<Item = (&BlockPos, &BlockState)> + '_ {
        self.blocks.iter()
    }

    pub fn slot(&self, slot: &SlotRef) -> ItemStack {
        self.inventories
            .get(&slot.inventory)
            .and_then(|slots| slots.get(slot.index as usize))
            .cloned()
            .unwrap_or_else(ItemStack::empty)
    }

    pub fn inventories(&self) -> impl Iterator<Item = (&InventoryId, &Vec<ItemStack>)> + '_ {
        self.inventories.iter()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySnapshot> + '_ {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Set a block without capturing, for world setup
    pub fn seed_block(&mut self, pos: BlockPos, state: BlockState) {
        self.write_block(pos, state);
    }

    /// Create an inventory of `size` empty slots
    pub fn add_inventory(&mut self, size: usize) -> InventoryId {
        let id = InventoryId::new();
        self.inventories.insert(id, vec![ItemStack::empty(); size]);
        id
    }

    /// Set a slot without capturing, for world setup
    pub fn seed_slot(&mut self, slot: SlotRef, stack: ItemStack) {
        self.write_slot(slot, stack);
    }

    pub fn set_block(&mut self, tracker: &PhaseTracker, pos: BlockPos, state: BlockState) -> PhaseResult<Capture> {
        let capture = tracker.record_block(pos, self.block(&pos), state.clone())?;
        self.write_block(pos, state);
        Ok(capture)
    }

    pub fn set_slot(&mut self, tracker: &PhaseTracker, slot: SlotRef, stack: ItemStack) -> PhaseResult<Capture> {
        let capture = tracker.record_slot(slot, self.slot(&slot), stack.clone())?;
        self.write_slot(slot, stack);
        Ok(capture)
    }

    pub fn spawn(&mut self, tracker: &PhaseTracker, entity: EntitySnapshot) -> PhaseResult<Capture> {
        let capture = tracker.record_entity_spawn(entity.clone())?;
        self.entities.insert(entity.id, entity);
        Ok(capture)
    }

    /// Undo everything `outcome` rejected, newest first. Returns how many
    /// transactions were undone.
    pub fn restore(&mut self, tracker: &PhaseTracker, outcome: &PhaseOutcome) -> PhaseResult<usize> {
        for tx in outcome.rejected_blocks.iter().rev() {
            self.set_block(tracker, *tx.target(), tx.original().clone())?;
        }
        for tx in outcome.rejected_slots.iter().rev() {
            self.set_slot(tracker, *tx.target(), tx.original().clone())?;
        }
        for tx in &outcome.rejected_spawns {
            self.entities.remove(tx.target());
        }
        Ok(outcome.rejected_count())
    }

    fn write_block(&mut self, pos: BlockPos, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
    }

    fn write_slot(&mut self, slot: SlotRef, stack: ItemStack) {
        let slots = self.inventories.entry(slot.inventory).or_default();
        let index = slot.index as usize;
        if slots.len() <= index {
            slots.resize(index + 1, ItemStack::empty());
        }
        slots[index] = stack;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::observability::TrackerMetrics;
    use crate::tracker::{PhaseKind, TrackerConfig};

    #[test]
    fn test_setters_capture_originals() {
        let tracker = PhaseTracker::new(TrackerConfig::default(), Arc::new(TrackerMetrics::new()));
        let mut state = WorldState::new();
        let pos = state.pos(0, 64, 0);
        state.seed_block(pos, BlockState::new("stone"));

        let guard = tracker.enter(PhaseKind::Command).unwrap();
        state.set_block(&tracker, pos, BlockState::air()).unwrap();
        let original = tracker
            .with_current_phase(|c| match c.transactions().iter().next() {
                Some(crate::transaction::CapturedTransaction::Block(tx)) => Some(tx.original().clone()),
                _ => None,
            })
            .flatten();
        guard.close().unwrap();

        assert_eq!(original, Some(BlockState::new("stone")));
        assert!(state.block(&pos).is_air());
    }

    #[test]
    fn test_restore_reverts_in_reverse() {
        let tracker = PhaseTracker::new(TrackerConfig::default(), Arc::new(TrackerMetrics::new()));
        let mut state = WorldState::new();
        let pos = state.pos(1, 1, 1);
        let outcome = PhaseOutcome {
            rejected_blocks: vec![
                crate::transaction::BlockTransaction::new(pos, BlockState::air(), BlockState::new("a")),
                crate::transaction::BlockTransaction::new(pos, BlockState::new("a"), BlockState::new("b")),
            ],
            ..PhaseOutcome::default()
        };
        state.seed_block(pos, BlockState::new("b"));

        assert_eq!(state.restore(&tracker, &outcome).unwrap(), 2);
        assert!(state.block(&pos).is_air());
    }

    #[test]
    fn test_slots_grow_on_write() {
        let mut state = WorldState::new();
        let inventory = state.add_inventory(1);
        state.seed_slot(SlotRef::new(inventory, 3), ItemStack::new("apple", 2));

        assert_eq!(state.slot(&SlotRef::new(inventory, 3)).quantity, 2);
        assert!(state.slot(&SlotRef::new(inventory, 1)).is_empty());
    }
}
