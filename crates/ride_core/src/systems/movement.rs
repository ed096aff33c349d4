//! Movement system: drifts every targeted driver toward its target.
//!
//! Runs on the global `PositionTick` event and reschedules the next tick, so
//! drivers keep moving for as long as the runner keeps advancing.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::ecs::{Driver, Position};
use crate::geo::drift_toward;
use crate::scenario::MovementConfig;

pub fn driver_movement_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    movement: Option<Res<MovementConfig>>,
    mut drivers: Query<(&Driver, &mut Position)>,
) {
    if event.0.kind != EventKind::PositionTick {
        return;
    }
    let config = movement.as_deref().copied().unwrap_or_default();

    for (driver, mut position) in &mut drivers {
        // Parked drivers stay put.
        let Some(target) = driver.target else {
            continue;
        };
        position.0 = drift_toward(position.0, target, config.drift_step);
    }

    if !clock.has_pending(EventKind::PositionTick, None) {
        clock.schedule_in(config.tick_interval_ms, EventKind::PositionTick, None);
    }
}
