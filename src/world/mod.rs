//! World boundary types
//!
//! The simulation decides what a block, slot or entity mutation is. These
//! are the shapes it hands to the capture calls, nothing more.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// World identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub Uuid);

impl WorldId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

/// Inventory identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InventoryId(pub Uuid);

impl InventoryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InventoryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Block position within a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub world: WorldId,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        Self { world, x, y, z }
    }

    /// Position shifted by the given deltas, same world
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.world, self.x + dx, self.y + dy, self.z + dz)
    }

    /// The six face neighbours
    pub fn neighbours(&self) -> [BlockPos; 6] {
        [
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Opaque block state identifier, e.g. `stone` or `oak_log[axis=y]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState(pub String);

impl BlockState {
    const AIR: &'static str = "air";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The empty block
    pub fn air() -> Self {
        Self(Self::AIR.to_string())
    }

    pub fn is_air(&self) -> bool {
        self.0 == Self::AIR
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Block state at a position, used as a cause by block ticks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub pos: BlockPos,
    pub state: BlockState,
}

impl BlockSnapshot {
    pub fn new(pos: BlockPos, state: BlockState) -> Self {
        Self { pos, state }
    }
}

/// One slot of one inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotRef {
    pub inventory: InventoryId,
    pub index: u32,
}

impl SlotRef {
    pub fn new(inventory: InventoryId, index: u32) -> Self {
        Self { inventory, index }
    }
}

/// Item stack held by a slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }

    /// The empty stack
    pub fn empty() -> Self {
        Self {
            item: String::new(),
            quantity: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0 || self.item.is_empty()
    }
}

/// Entity as it looked when it was added to the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub entity_type: String,
    pub position: [f64; 3],
}

impl EntitySnapshot {
    pub fn new(entity_type: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            id: EntityId::new(),
            entity_type: entity_type.into(),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air() {
        assert!(BlockState::air().is_air());
        assert!(!BlockState::new("stone").is_air());
    }

    #[test]
    fn test_empty_stack() {
        assert!(ItemStack::empty().is_empty());
        assert!(ItemStack::new("dirt", 0).is_empty());
        assert!(!ItemStack::new("dirt", 3).is_empty());
    }

    #[test]
    fn test_neighbours_stay_in_world() {
        let pos = BlockPos::new(WorldId::new(), 0, 10, 0);
        let around = pos.neighbours();
        assert!(around.iter().all(|p| p.world == pos.world));
        assert!(around.contains(&pos.offset(0, -1, 0)));
        assert!(!around.contains(&pos));
    }

    #[test]
    fn test_block_pos_serializes() {
        let pos = BlockPos::new(WorldId::new(), 1, 64, -3);
        let json = serde_json::to_value(pos).unwrap();
        assert_eq!(json["y"], 64);
        assert_eq!(json["z"], -3);
    }
}
