use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::SimulationClock;
use crate::ecs::{Driver, Position, Ride};
use crate::session::RiderSession;
use crate::telemetry::{
    DriverSnapshot, RideSnapshot, SimCounts, SimSnapshot, SimSnapshotConfig, SimSnapshots,
};

pub fn capture_snapshot_system(
    clock: Res<SimulationClock>,
    config: Res<SimSnapshotConfig>,
    mut snapshots: ResMut<SimSnapshots>,
    session: Option<Res<RiderSession>>,
    drivers: Query<(&Driver, &Position)>,
    rides: Query<&Ride>,
) {
    let mut counts = SimCounts::default();
    let mut driver_snapshots: Vec<DriverSnapshot> = drivers
        .iter()
        .map(|(driver, position)| {
            counts.add_driver(driver.busy, driver.target.is_some());
            DriverSnapshot {
                driver_id: driver.id,
                position: position.0,
                cell: position.0.to_cell(),
                busy: driver.busy,
                has_target: driver.target.is_some(),
            }
        })
        .collect();
    // Registry order.
    driver_snapshots.sort_by_key(|snapshot| snapshot.driver_id);

    let ride = session
        .as_deref()
        .and_then(|session| session.ride)
        .and_then(|entity| rides.get(entity).ok())
        .map(|ride| {
            let distance_to_target_m = ride
                .current_target()
                .zip(ride.driver)
                .and_then(|(target, driver)| {
                    let (_, position) = drivers.get(driver).ok()?;
                    Some(crate::geo::distance_meters(position.0, target))
                });
            RideSnapshot {
                ride_id: ride.id,
                status: ride.status,
                driver_id: ride.driver_id,
                distance_to_target_m,
            }
        });

    let stage = session.as_deref().map(|s| s.stage).unwrap_or_default();
    snapshots.push(
        SimSnapshot {
            timestamp_ms: clock.now(),
            stage,
            counts,
            drivers: driver_snapshots,
            ride,
        },
        config.max_snapshots,
    );
}
