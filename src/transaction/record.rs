//! Captured transactions
//!
//! A transaction is an immutable record of one mutation: what was changed,
//! what it was before and what it became. The tracker never applies them;
//! it only keeps them so listeners can veto and the host can restore.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::world::{BlockPos, BlockState, EntityId, EntitySnapshot, ItemStack, SlotRef};

/// One recorded mutation of `target` from `original` to `replacement`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction<K, V> {
    target: K,
    original: V,
    replacement: V,
}

impl<K, V> Transaction<K, V> {
    pub fn new(target: K, original: V, replacement: V) -> Self {
        Self {
            target,
            original,
            replacement,
        }
    }

    pub fn target(&self) -> &K {
        &self.target
    }

    pub fn original(&self) -> &V {
        &self.original
    }

    pub fn replacement(&self) -> &V {
        &self.replacement
    }
}

pub type BlockTransaction = Transaction<BlockPos, BlockState>;
pub type SlotTransaction = Transaction<SlotRef, ItemStack>;
/// Spawns have nothing to restore to: the original is always `None`
pub type SpawnTransaction = Transaction<EntityId, Option<EntitySnapshot>>;

impl Transaction<EntityId, Option<EntitySnapshot>> {
    pub fn spawn(entity: EntitySnapshot) -> Self {
        Self::new(entity.id, None, Some(entity))
    }

    /// The spawned entity
    pub fn entity(&self) -> Option<&EntitySnapshot> {
        self.replacement.as_ref()
    }
}

/// Capture kinds, one per transaction variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureKind {
    Block,
    Slot,
    EntitySpawn,
}

impl CaptureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureKind::Block => "block",
            CaptureKind::Slot => "slot",
            CaptureKind::EntitySpawn => "entity_spawn",
        }
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of everything a phase can capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CapturedTransaction {
    Block(BlockTransaction),
    Slot(SlotTransaction),
    EntitySpawn(SpawnTransaction),
}

impl CapturedTransaction {
    pub fn kind(&self) -> CaptureKind {
        match self {
            CapturedTransaction::Block(_) => CaptureKind::Block,
            CapturedTransaction::Slot(_) => CaptureKind::Slot,
            CapturedTransaction::EntitySpawn(_) => CaptureKind::EntitySpawn,
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            CapturedTransaction::Block(tx) => format!(
                "block {} {} -> {}",
                tx.target(),
                tx.original(),
                tx.replacement()
            ),
            CapturedTransaction::Slot(tx) => format!(
                "slot {}#{} {}x{} -> {}x{}",
                tx.target().inventory.0,
                tx.target().index,
                tx.original().quantity,
                tx.original().item,
                tx.replacement().quantity,
                tx.replacement().item
            ),
            CapturedTransaction::EntitySpawn(tx) => match tx.entity() {
                Some(entity) => format!("spawn {} {}", entity.entity_type, entity.id.0),
                None => format!("spawn {}", tx.target().0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldId;

    #[test]
    fn test_spawn_transaction_has_no_original() {
        let zombie = EntitySnapshot::new("zombie", [0.5, 64.0, 0.5]);
        let tx = SpawnTransaction::spawn(zombie.clone());

        assert_eq!(tx.original(), &None);
        assert_eq!(tx.entity(), Some(&zombie));
        assert_eq!(tx.target(), &zombie.id);
    }

    #[test]
    fn test_kind_and_describe() {
        let pos = BlockPos::new(WorldId::new(), 1, 2, 3);
        let tx = CapturedTransaction::Block(BlockTransaction::new(
            pos,
            BlockState::new("stone"),
            BlockState::air(),
        ));

        assert_eq!(tx.kind(), CaptureKind::Block);
        assert_eq!(tx.describe(), "block (1, 2, 3) stone -> air");
    }
}
