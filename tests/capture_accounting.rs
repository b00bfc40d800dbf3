//! Capture Accounting Tests
//!
//! - Every capture is either recorded in exactly one phase or counted missed
//! - Finalization posts block events as break, place, modify
//! - Each event keeps capture order

use std::sync::{Arc, Mutex};

use causeway::event::{BlockChange, ChangeBlockEvent, ChangeInventoryEvent, EventManager, PluginId, SpawnEntityEvent};
use causeway::observability::TrackerMetrics;
use causeway::tracker::{Capture, PhaseKind, PhaseTracker, TrackerConfig};
use causeway::world::{BlockPos, BlockState, EntitySnapshot, InventoryId, ItemStack, SlotRef, WorldId};

fn setup(config: TrackerConfig) -> (PhaseTracker, Arc<EventManager>, Arc<TrackerMetrics>) {
    let metrics = Arc::new(TrackerMetrics::new());
    let events = Arc::new(EventManager::new(metrics.clone()));
    (PhaseTracker::new(config, metrics.clone()), events, metrics)
}

// =============================================================================
// Finalization Order Tests
// =============================================================================

/// Interleaved block changes are posted grouped by change, capture order kept.
#[test]
fn test_block_events_posted_break_place_modify() {
    let (tracker, events, _) = setup(TrackerConfig::default());
    let world = WorldId::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    events
        .register(&PluginId::new("observer"), 0, move |event: &mut ChangeBlockEvent| {
            let xs: Vec<i32> = event.transactions().iter().map(|t| t.transaction().target().x).collect();
            sink.lock().unwrap().push((event.change(), xs));
            Ok(())
        })
        .unwrap();

    let phase = tracker
        .push_phase(PhaseKind::PlayerInteraction, |b| b.post_to(Arc::clone(&events)))
        .unwrap();
    let at = |x| BlockPos::new(world, x, 64, 0);
    tracker.record_block(at(1), BlockState::new("stone"), BlockState::new("cobblestone")).unwrap();
    tracker.record_block(at(2), BlockState::air(), BlockState::new("torch")).unwrap();
    tracker.record_block(at(3), BlockState::new("dirt"), BlockState::air()).unwrap();
    tracker.record_block(at(4), BlockState::air(), BlockState::new("torch")).unwrap();
    tracker.record_block(at(5), BlockState::new("sand"), BlockState::air()).unwrap();
    phase.close().unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (BlockChange::Break, vec![3, 5]),
            (BlockChange::Place, vec![2, 4]),
            (BlockChange::Modify, vec![1]),
        ]
    );
}

/// One phase yields one inventory event and one spawn event.
#[test]
fn test_slot_and_spawn_events() {
    let (tracker, events, metrics) = setup(TrackerConfig::default());
    let inventory = InventoryId::new();
    let counts = Arc::new(Mutex::new((0usize, 0usize)));

    let slots = Arc::clone(&counts);
    events
        .register(&PluginId::new("a"), 0, move |event: &mut ChangeInventoryEvent| {
            slots.lock().unwrap().0 += event.slots().count();
            Ok(())
        })
        .unwrap();
    let spawns = Arc::clone(&counts);
    events
        .register(&PluginId::new("b"), 0, move |event: &mut SpawnEntityEvent| {
            spawns.lock().unwrap().1 += event.entities().count();
            Ok(())
        })
        .unwrap();

    let phase = tracker
        .push_phase(PhaseKind::EntityTick, |b| b.post_to(Arc::clone(&events)))
        .unwrap();
    tracker
        .record_slot(SlotRef::new(inventory, 0), ItemStack::empty(), ItemStack::new("bone", 1))
        .unwrap();
    tracker
        .record_slot(SlotRef::new(inventory, 1), ItemStack::empty(), ItemStack::new("bone", 2))
        .unwrap();
    tracker
        .record_entity_spawn(EntitySnapshot::new("arrow", [0.0, 65.0, 0.0]))
        .unwrap();
    phase.close().unwrap();

    assert_eq!(*counts.lock().unwrap(), (2, 1));
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.transactions_captured, 3);
    assert_eq!(snapshot.events_posted, 2);
    assert_eq!(snapshot.missed_captures, 0);
}

/// Slot transactions reach the inventory event in capture order.
#[test]
fn test_inventory_event_keeps_capture_order() {
    let (tracker, events, _) = setup(TrackerConfig::default());
    let inventory = InventoryId::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    events
        .register(&PluginId::new("observer"), 0, move |event: &mut ChangeInventoryEvent| {
            sink.lock().unwrap().extend(event.slots().map(|slot| slot.index));
            Ok(())
        })
        .unwrap();

    let phase = tracker
        .push_phase(PhaseKind::PlayerInteraction, |b| b.post_to(Arc::clone(&events)))
        .unwrap();
    for index in [2, 0, 1] {
        tracker
            .record_slot(SlotRef::new(inventory, index), ItemStack::empty(), ItemStack::new("torch", index + 1))
            .unwrap();
    }
    phase.close().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![2, 0, 1]);
}

/// A phase closed without a completion accounts for its captures as missed.
#[test]
fn test_phase_without_completion_reports_missed() {
    let (tracker, _, metrics) = setup(TrackerConfig::default());
    let phase = tracker.enter(PhaseKind::BlockTick).unwrap();
    let capture = tracker
        .record_block(BlockPos::new(WorldId::new(), 0, 64, 0), BlockState::new("stone"), BlockState::air())
        .unwrap();
    phase.close().unwrap();

    assert!(capture.is_recorded());
    assert_eq!(metrics.missed_captures(), 1);
    assert_eq!(metrics.snapshot().events_posted, 0);
}

// =============================================================================
// Missed Capture Tests
// =============================================================================

/// Captures with no phase, or refused by the phase kind, are counted missed.
#[test]
fn test_missed_captures_are_counted() {
    let (tracker, events, metrics) = setup(TrackerConfig::default());
    let slot = SlotRef::new(InventoryId::new(), 0);

    let idle = tracker
        .record_slot(slot, ItemStack::empty(), ItemStack::new("apple", 1))
        .unwrap();
    assert_eq!(idle, Capture::Missed);

    let phase = tracker
        .push_phase(PhaseKind::Explosion, |b| b.post_to(Arc::clone(&events)))
        .unwrap();
    let refused = tracker
        .record_slot(slot, ItemStack::empty(), ItemStack::new("apple", 1))
        .unwrap();
    assert_eq!(refused, Capture::Missed);
    let accepted = tracker
        .record_entity_spawn(EntitySnapshot::new("item", [0.0, 64.0, 0.0]))
        .unwrap();
    assert!(accepted.is_recorded());
    phase.close().unwrap();

    assert_eq!(metrics.missed_captures(), 2);
    assert_eq!(metrics.snapshot().transactions_captured, 1);
}

/// The log rate limit never affects the missed counter.
#[test]
fn test_missed_counter_ignores_log_limit() {
    let config = TrackerConfig {
        max_missed_capture_reports: 1,
        ..TrackerConfig::default()
    };
    let (tracker, _, metrics) = setup(config);
    let world = WorldId::new();

    for x in 0..5 {
        tracker
            .record_block(BlockPos::new(world, x, 0, 0), BlockState::air(), BlockState::new("stone"))
            .unwrap();
    }
    assert_eq!(metrics.missed_captures(), 5);
}
