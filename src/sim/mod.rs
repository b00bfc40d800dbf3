//! Reference world
//!
//! A small deterministic host that drives the tracker the way a real
//! simulation would: a `WorldTick` phase per tick with nested block,
//! explosion, tile entity and spawner phases. Rejected transactions are
//! undone afterwards inside a `BlockRestore` phase.
//!
//! Rules per tick:
//! - `sapling` grows into `oak_log` with `leaves` above it
//! - `tnt` explodes, breaking itself and its non-air neighbours (except
//!   `bedrock`) and dropping one `item` entity per broken block
//! - hoppers move one item from slot 0 into slot 1
//! - every `SPAWN_INTERVAL` ticks a `zombie` spawns at the origin

mod state;

use std::sync::{Arc, Mutex};

use serde::Serialize;

pub use state::WorldState;

use crate::cause::{keys, Causal};
use crate::event::{
    BlockChange, ChangeBlockEvent, ChangeInventoryEvent, Event, EventManager, EventResult, PluginId, SpawnEntityEvent,
};
use crate::observability::{LogEvent, Logger, PhaseObserver};
use crate::tracker::{PhaseBuilder, PhaseKind, PhaseResult, PhaseTracker, TrackerConfig};
use crate::transaction::PhaseOutcome;
use crate::world::{BlockPos, BlockSnapshot, BlockState, EntitySnapshot, InventoryId, ItemStack, SlotRef};

pub const SPAWN_INTERVAL: u64 = 5;

/// Cause pushed for hopper transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hopper {
    pub inventory: InventoryId,
}

impl Causal for Hopper {
    fn describe(&self) -> String {
        format!("hopper:{}", self.inventory.0)
    }
}

/// Cause pushed for natural spawns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawner;

impl Causal for Spawner {}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub phases_finalized: usize,
    pub events_posted: usize,
    pub events_cancelled: usize,
    pub restored: usize,
}

type OutcomeSink = Arc<Mutex<Vec<PhaseOutcome>>>;

pub struct SimWorld {
    tracker: PhaseTracker,
    events: Arc<EventManager>,
    state: WorldState,
    hoppers: Vec<InventoryId>,
    outcomes: OutcomeSink,
    tick: u64,
}

impl SimWorld {
    /// Build a world bound to the calling thread
    pub fn new(config: TrackerConfig, observer: Arc<dyn PhaseObserver>) -> Self {
        let events = Arc::new(EventManager::new(Arc::clone(&observer)));
        Self {
            tracker: PhaseTracker::new(config, observer),
            events,
            state: WorldState::new(),
            hoppers: Vec::new(),
            outcomes: Arc::new(Mutex::new(Vec::new())),
            tick: 0,
        }
    }

    pub fn tracker(&self) -> &PhaseTracker {
        &self.tracker
    }

    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Add a two-slot hopper holding `stack` in slot 0
    pub fn add_hopper(&mut self, stack: ItemStack) -> InventoryId {
        let inventory = self.state.add_inventory(2);
        self.state.seed_slot(SlotRef::new(inventory, 0), stack);
        self.hoppers.push(inventory);
        inventory
    }

    /// A small demo layout: saplings, a tnt next to bedrock, one hopper
    pub fn seed_demo(&mut self) {
        let state = &mut self.state;
        let sapling = state.pos(0, 64, 4);
        let tnt = state.pos(4, 64, 0);
        state.seed_block(sapling, BlockState::new("sapling"));
        state.seed_block(state.pos(-4, 64, 0), BlockState::new("sapling"));
        state.seed_block(tnt, BlockState::new("tnt"));
        state.seed_block(tnt.offset(1, 0, 0), BlockState::new("stone"));
        state.seed_block(tnt.offset(0, -1, 0), BlockState::new("bedrock"));
        self.add_hopper(ItemStack::new("iron_ingot", 3));
    }

    /// Run one tick and undo whatever listeners rejected
    pub fn tick(&mut self) -> PhaseResult<TickReport> {
        self.tick += 1;
        let tick = self.tick;
        let tick_field = tick.to_string();
        Logger::event(LogEvent::SimulationTick, &[("tick", &tick_field)]);

        let tracker = &self.tracker;
        let state = &mut self.state;
        let world = state.id();
        let finalize = Finalize {
            events: &self.events,
            sink: &self.outcomes,
        };

        let world_phase = tracker.push_phase(PhaseKind::WorldTick, |b| {
            finalize.apply(b.context(keys::TICK, tick).context(keys::WORLD, world))
        })?;

        let scheduled: Vec<(BlockPos, BlockState)> = state
            .blocks()
            .filter(|(_, block)| matches!(block.id(), "sapling" | "tnt"))
            .map(|(pos, block)| (*pos, block.clone()))
            .collect();
        for (pos, block) in scheduled {
            let snapshot = BlockSnapshot::new(pos, block.clone());
            match block.id() {
                "sapling" => {
                    let phase = tracker.push_phase(PhaseKind::BlockTick, |b| finalize.apply(b.cause_of(snapshot)))?;
                    state.set_block(tracker, pos, BlockState::new("oak_log"))?;
                    state.set_block(tracker, pos.offset(0, 1, 0), BlockState::new("leaves"))?;
                    phase.close()?;
                }
                _ => {
                    let phase = tracker.push_phase(PhaseKind::Explosion, |b| finalize.apply(b.cause_of(snapshot)))?;
                    explode(state, tracker, pos)?;
                    phase.close()?;
                }
            }
        }

        for &inventory in &self.hoppers {
            let phase = tracker.push_phase(PhaseKind::TileEntityTick, |b| {
                finalize.apply(b.cause_of(Hopper { inventory }))
            })?;
            transfer(state, tracker, inventory)?;
            phase.close()?;
        }

        if tick % SPAWN_INTERVAL == 0 {
            let phase = tracker.push_phase(PhaseKind::WorldSpawner, |b| finalize.apply(b.cause_of(Spawner)))?;
            state.spawn(tracker, EntitySnapshot::new("zombie", [0.5, 64.0, 0.5]))?;
            phase.close()?;
        }

        world_phase.close()?;
        self.restore_rejected(tick)
    }

    fn restore_rejected(&mut self, tick: u64) -> PhaseResult<TickReport> {
        let outcomes: Vec<PhaseOutcome> = match self.outcomes.lock() {
            Ok(mut outcomes) => std::mem::take(&mut *outcomes),
            Err(_) => Vec::new(),
        };
        let mut report = TickReport {
            tick,
            phases_finalized: outcomes.len(),
            ..TickReport::default()
        };
        for outcome in &outcomes {
            report.events_posted += outcome.events_posted;
            report.events_cancelled += outcome.events_cancelled;
        }

        if outcomes.iter().any(PhaseOutcome::has_rejections) {
            let tracker = &self.tracker;
            let phase = tracker.push_phase(PhaseKind::BlockRestore, |b| b.context(keys::TICK, tick))?;
            // Later phases saw the earlier phases' replacements as originals.
            for outcome in outcomes.iter().rev() {
                report.restored += self.state.restore(tracker, outcome)?;
            }
            phase.close()?;
        }
        Ok(report)
    }
}

/// Attaches the standard completion that posts through `events` and
/// collects the outcome for restoration
struct Finalize<'a> {
    events: &'a Arc<EventManager>,
    sink: &'a OutcomeSink,
}

impl Finalize<'_> {
    fn apply(&self, builder: PhaseBuilder) -> PhaseBuilder {
        let sink = Arc::clone(self.sink);
        builder.post_to_then(Arc::clone(self.events), move |_, outcome| {
            if let Ok(mut outcomes) = sink.lock() {
                outcomes.push(outcome);
            }
        })
    }
}

fn explode(state: &mut WorldState, tracker: &PhaseTracker, center: BlockPos) -> PhaseResult<()> {
    let mut broken = vec![center];
    broken.extend(center.neighbours().into_iter().filter(|pos| {
        let block = state.block(pos);
        !block.is_air() && block.id() != "bedrock"
    }));

    for pos in broken {
        state.set_block(tracker, pos, BlockState::air())?;
        let drop_at = [pos.x as f64 + 0.5, pos.y as f64, pos.z as f64 + 0.5];
        state.spawn(tracker, EntitySnapshot::new("item", drop_at))?;
    }
    Ok(())
}

fn transfer(state: &mut WorldState, tracker: &PhaseTracker, inventory: InventoryId) -> PhaseResult<()> {
    let from = SlotRef::new(inventory, 0);
    let to = SlotRef::new(inventory, 1);
    let source = state.slot(&from);
    let target = state.slot(&to);
    if source.is_empty() || (!target.is_empty() && target.item != source.item) {
        return Ok(());
    }

    let remaining = ItemStack::new(source.item.clone(), source.quantity - 1);
    let remaining = if remaining.is_empty() { ItemStack::empty() } else { remaining };
    state.set_slot(tracker, from, remaining)?;
    state.set_slot(tracker, to, ItemStack::new(source.item, target.quantity + 1))?;
    Ok(())
}

/// Listeners used by the demo: bedrock cannot be broken, zombies never
/// spawn naturally, inventory changes are only observed
pub fn install_sample_listeners(events: &EventManager) -> EventResult<()> {
    let guard = PluginId::new("bedrock-guard");
    events.register(&guard, 0, |event: &mut ChangeBlockEvent| {
        if event.change() == BlockChange::Break {
            for tx in event.transactions_mut() {
                if tx.transaction().original().id() == "bedrock" {
                    tx.invalidate();
                }
            }
        }
        Ok(())
    })?;

    let peaceful = PluginId::new("peaceful");
    events.register(&peaceful, 0, |event: &mut SpawnEntityEvent| {
        if event.cause().first::<Spawner>().is_some() {
            event.invalidate_type("zombie");
        }
        Ok(())
    })?;

    let audit = PluginId::new("audit");
    events.register(&audit, crate::event::Order::LAST, |event: &mut ChangeInventoryEvent| {
        let slots = event.slots().count().to_string();
        Logger::info("INVENTORY_AUDIT", &[("slots", &slots)]);
        Ok(())
    })?;
    Ok(())
}
