//! Phase kinds and what each one captures

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transaction::CaptureKind;

/// Capture kinds a phase accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureInterests {
    pub blocks: bool,
    pub slots: bool,
    pub entity_spawns: bool,
}

impl CaptureInterests {
    pub const ALL: Self = Self {
        blocks: true,
        slots: true,
        entity_spawns: true,
    };

    pub const NONE: Self = Self {
        blocks: false,
        slots: false,
        entity_spawns: false,
    };

    pub const SPAWNS_ONLY: Self = Self {
        blocks: false,
        slots: false,
        entity_spawns: true,
    };

    pub fn accepts(&self, kind: CaptureKind) -> bool {
        match kind {
            CaptureKind::Block => self.blocks,
            CaptureKind::Slot => self.slots,
            CaptureKind::EntitySpawn => self.entity_spawns,
        }
    }
}

/// Closed set of phase kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseKind {
    /// Whole-world tick (weather, time, scheduled updates)
    WorldTick,
    BlockTick,
    EntityTick,
    TileEntityTick,
    PlayerInteraction,
    Command,
    Explosion,
    PluginListener,
    ScheduledTask,
    ChunkLoad,
    /// Natural mob spawning
    WorldSpawner,
    DeathDrops,
    /// Undoing rejected transactions; captures nothing
    BlockRestore,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::WorldTick => "WorldTick",
            PhaseKind::BlockTick => "BlockTick",
            PhaseKind::EntityTick => "EntityTick",
            PhaseKind::TileEntityTick => "TileEntityTick",
            PhaseKind::PlayerInteraction => "PlayerInteraction",
            PhaseKind::Command => "Command",
            PhaseKind::Explosion => "Explosion",
            PhaseKind::PluginListener => "PluginListener",
            PhaseKind::ScheduledTask => "ScheduledTask",
            PhaseKind::ChunkLoad => "ChunkLoad",
            PhaseKind::WorldSpawner => "WorldSpawner",
            PhaseKind::DeathDrops => "DeathDrops",
            PhaseKind::BlockRestore => "BlockRestore",
        }
    }

    pub fn interests(&self) -> CaptureInterests {
        match self {
            PhaseKind::WorldTick
            | PhaseKind::BlockTick
            | PhaseKind::EntityTick
            | PhaseKind::TileEntityTick
            | PhaseKind::PlayerInteraction
            | PhaseKind::Command
            | PhaseKind::PluginListener
            | PhaseKind::ScheduledTask => CaptureInterests::ALL,
            PhaseKind::Explosion => CaptureInterests {
                blocks: true,
                slots: false,
                entity_spawns: true,
            },
            PhaseKind::DeathDrops => CaptureInterests {
                blocks: false,
                slots: true,
                entity_spawns: true,
            },
            PhaseKind::ChunkLoad | PhaseKind::WorldSpawner => CaptureInterests::SPAWNS_ONLY,
            PhaseKind::BlockRestore => CaptureInterests::NONE,
        }
    }

    pub fn accepts(&self, kind: CaptureKind) -> bool {
        self.interests().accepts(kind)
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_accepts_nothing() {
        assert_eq!(PhaseKind::BlockRestore.interests(), CaptureInterests::NONE);
        assert!(!PhaseKind::BlockRestore.accepts(CaptureKind::Block));
    }

    #[test]
    fn test_spawner_only_spawns() {
        assert!(PhaseKind::WorldSpawner.accepts(CaptureKind::EntitySpawn));
        assert!(!PhaseKind::WorldSpawner.accepts(CaptureKind::Block));
        assert!(!PhaseKind::Explosion.accepts(CaptureKind::Slot));
        assert!(PhaseKind::BlockTick.accepts(CaptureKind::Slot));
    }
}
