//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule.
//!
//! The position tick reschedules itself, so once [initialize_simulation] has run
//! the queue never drains on its own. Bound runs with [run_until],
//! [SimulationEndTimeMs] or a step limit.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::profiling::EventMetrics;
use crate::scenario::{MovementConfig, SimulationEndTimeMs};
use crate::systems::{
    matching::matching_system, movement::driver_movement_system, proximity::proximity_system,
    telemetry_snapshot::capture_snapshot_system,
};
use crate::telemetry::{SimSnapshotConfig, SimSnapshots};

// Condition functions for each event kind
fn is_position_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::PositionTick)
        .unwrap_or(false)
}

fn is_try_match(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TryMatch)
        .unwrap_or(false)
}

fn is_proximity_check(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ProximityCheck)
        .unwrap_or(false)
}

/// Condition: telemetry snapshot interval has elapsed.
fn should_capture_snapshot(
    clock: Option<Res<SimulationClock>>,
    config: Option<Res<SimSnapshotConfig>>,
    snapshots: Option<Res<SimSnapshots>>,
) -> bool {
    let (Some(clock), Some(config), Some(snapshots)) = (clock, config, snapshots) else {
        return false;
    };
    match snapshots.last_snapshot_at {
        None => true,
        Some(last) => clock.now().saturating_sub(last) >= config.interval_ms,
    }
}

/// Pops the next event unless it lies at or past [SimulationEndTimeMs].
fn pop_next_event(world: &mut World) -> Option<Event> {
    let stop_at = world.get_resource::<SimulationEndTimeMs>().map(|e| e.0);
    let event = {
        let mut clock = world.get_resource_mut::<SimulationClock>()?;
        if let (Some(end_ms), Some(ts)) = (stop_at, clock.next_event_time()) {
            if ts >= end_ms {
                return None;
            }
        }
        clock.pop_next()?
    };
    world.insert_resource(CurrentEvent(event));

    // Track event metrics if EventMetrics resource exists
    if let Some(mut metrics) = world.get_resource_mut::<EventMetrics>() {
        metrics.record_event(event.kind);
    }
    Some(event)
}

/// Runs one simulation step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `true` if an event was processed, `false` if the clock was empty or if the next event
/// is at or past [SimulationEndTimeMs] (when that resource is present).
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    if pop_next_event(world).is_none() {
        return false;
    }
    schedule.run(world);
    true
}

/// Runs one simulation step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let Some(event) = pop_next_event(world) else {
        return false;
    };
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs simulation steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Runs every event strictly before `end_ms` (simulation time).
/// Returns the number of steps executed.
pub fn run_until(world: &mut World, schedule: &mut Schedule, end_ms: u64) -> usize {
    let mut steps = 0;
    loop {
        let next = world
            .get_resource::<SimulationClock>()
            .and_then(|c| c.next_event_time());
        match next {
            Some(ts) if ts < end_ms => {}
            _ => break,
        }
        if !run_next_event(world, schedule) {
            break;
        }
        steps += 1;
    }
    steps
}

/// Builds the simulation schedule. One system per event kind, each gated on
/// [CurrentEvent], followed by the interval-gated snapshot.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.add_systems(
        (
            // PositionTick
            driver_movement_system.run_if(is_position_tick),
            // TryMatch
            matching_system.run_if(is_try_match),
            // ProximityCheck
            proximity_system.run_if(is_proximity_check),
            capture_snapshot_system.run_if(should_capture_snapshot),
        )
            .chain(),
    );

    schedule
}

/// Schedules the first position tick one tick interval from now.
/// Call this after building the scenario and before running events.
pub fn initialize_simulation(world: &mut World) {
    let interval = world
        .get_resource::<MovementConfig>()
        .copied()
        .unwrap_or_default()
        .tick_interval_ms;
    let mut clock = world.get_resource_or_insert_with(SimulationClock::default);
    if !clock.has_pending(EventKind::PositionTick, None) {
        clock.schedule_in(interval, EventKind::PositionTick, None);
    }
}
