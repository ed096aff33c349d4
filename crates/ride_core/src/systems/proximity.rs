//! Proximity polling: moves the ride through pickup and dropoff.
//!
//! Each `ProximityCheck` compares the assigned driver with the ride's current
//! target. While the driver is not close enough the check polls again; on
//! dropoff the ride completes, the driver is freed and polling stops.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::ecs::{Driver, Position, Ride, RideTiming};
use crate::lifecycle::{ProximityOutcome, RideStage};
use crate::scenario::ProximityConfig;
use crate::session::RiderSession;
use crate::telemetry::{CompletedRideRecord, RideTelemetry};

pub fn proximity_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    proximity: Option<Res<ProximityConfig>>,
    mut session: ResMut<RiderSession>,
    mut telemetry: ResMut<RideTelemetry>,
    mut rides: Query<(&mut Ride, &mut RideTiming)>,
    mut drivers: Query<(&mut Driver, &Position)>,
) {
    if event.0.kind != EventKind::ProximityCheck {
        return;
    }
    let Some(EventSubject::Ride(ride_entity)) = event.0.subject else {
        return;
    };
    let Ok((mut ride, mut timing)) = rides.get_mut(ride_entity) else {
        return;
    };
    let Some(driver_entity) = ride.driver else {
        return;
    };
    let Ok((mut driver, position)) = drivers.get_mut(driver_entity) else {
        return;
    };
    let config = proximity.as_deref().copied().unwrap_or_default();
    let now = clock.now();

    match ride.check_proximity(position.0, config.threshold_m) {
        ProximityOutcome::ReachedPickup => {
            if ride.mark_picked_up(&mut timing, now) {
                driver.retarget(ride.dropoff);
                log::info!("{} picked up by {}", ride.id, driver.id);
                log::debug!("{} driver_assigned -> picked_up", ride.id);
            }
        }
        ProximityOutcome::ReachedDropoff => {
            if !ride.mark_completed(&mut timing, now) {
                return;
            }
            driver.release();
            if session.ride == Some(ride_entity) {
                session.stage = RideStage::Idle;
            }
            telemetry.completed_rides.push(CompletedRideRecord {
                ride_id: ride.id,
                driver_id: driver.id,
                pickup: ride.pickup,
                dropoff: ride.dropoff,
                requested_at: timing.requested_at,
                matched_at: timing.matched_at.unwrap_or(timing.requested_at),
                picked_up_at: timing.picked_up_at.unwrap_or(now),
                completed_at: now,
            });
            log::info!("{} completed by {}", ride.id, driver.id);
            log::debug!("stage matched -> idle");
            return;
        }
        ProximityOutcome::Pending => {
            if ride.status.is_terminal() {
                return;
            }
        }
    }

    clock.schedule_in(
        config.poll_interval_ms,
        EventKind::ProximityCheck,
        Some(EventSubject::Ride(ride_entity)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Event;
    use crate::ecs::{DriverId, RideId, RideStatus};
    use crate::geo::{Coordinate, METERS_PER_DEGREE_LAT};
    use bevy_ecs::prelude::{Entity, Schedule, World};

    const PICKUP: Coordinate = Coordinate::new(-9.4400, 147.1800);
    const DROPOFF: Coordinate = Coordinate::new(-9.4500, 147.1900);

    fn north_of(c: Coordinate, meters: f64) -> Coordinate {
        Coordinate::new(c.lat + meters / METERS_PER_DEGREE_LAT, c.lng)
    }

    /// Matched ride with its driver parked at `driver_at`.
    fn matched_world(driver_at: Coordinate) -> (World, Entity, Entity) {
        let mut world = World::new();
        world.insert_resource(SimulationClock::default());
        world.insert_resource(RideTelemetry::default());
        world.insert_resource(ProximityConfig::default());

        let mut driver = Driver::new(DriverId(3), "Dalu", "Mitsubishi Lancer");
        driver.assign(PICKUP);
        let driver = world.spawn((driver, Position(driver_at))).id();

        let mut ride = Ride::new(RideId(1), PICKUP, DROPOFF, 0);
        let mut timing = RideTiming::default();
        assert!(ride.mark_matched(&mut timing, driver, DriverId(3), 2_000));
        let ride = world.spawn((ride, timing)).id();

        world.insert_resource(RiderSession {
            stage: RideStage::Matched,
            ride: Some(ride),
            next_ride_seq: 2,
        });
        world.insert_resource(CurrentEvent(Event {
            timestamp: 0,
            kind: EventKind::ProximityCheck,
            subject: Some(EventSubject::Ride(ride)),
        }));
        (world, ride, driver)
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(proximity_system);
        schedule.run(world);
    }

    #[test]
    fn driver_inside_threshold_picks_up() {
        let (mut world, ride, driver) = matched_world(north_of(PICKUP, 35.0));
        run(&mut world);

        assert_eq!(world.get::<Ride>(ride).expect("ride").status, RideStatus::PickedUp);
        let driver = world.get::<Driver>(driver).expect("driver");
        assert_eq!(driver.target, Some(DROPOFF));
        assert!(driver.busy);
        assert!(world
            .resource::<SimulationClock>()
            .has_pending(EventKind::ProximityCheck, Some(EventSubject::Ride(ride))));
    }

    #[test]
    fn driver_outside_threshold_keeps_polling() {
        let (mut world, ride, _) = matched_world(north_of(PICKUP, 45.0));
        run(&mut world);

        assert_eq!(
            world.get::<Ride>(ride).expect("ride").status,
            RideStatus::DriverAssigned
        );
        assert_eq!(world.resource::<SimulationClock>().next_event_time(), Some(1000));
    }

    #[test]
    fn dropoff_completes_and_frees_driver() {
        let (mut world, ride, driver) = matched_world(PICKUP);
        run(&mut world);
        world.get_mut::<Position>(driver).expect("position").0 = north_of(DROPOFF, 10.0);
        world.resource_mut::<SimulationClock>().clear();
        run(&mut world);

        assert_eq!(world.get::<Ride>(ride).expect("ride").status, RideStatus::Completed);
        assert!(world.get::<Driver>(driver).expect("driver").is_free());
        assert_eq!(world.resource::<RiderSession>().stage, RideStage::Idle);
        assert!(world.resource::<SimulationClock>().is_empty());

        let records = &world.resource::<RideTelemetry>().completed_rides;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].driver_id, DriverId(3));
        assert_eq!(records[0].matched_at, 2_000);
    }

    #[test]
    fn replayed_check_after_completion_is_a_no_op() {
        let (mut world, ride, driver) = matched_world(PICKUP);
        run(&mut world);
        world.get_mut::<Position>(driver).expect("position").0 = DROPOFF;
        run(&mut world);
        world.resource_mut::<SimulationClock>().clear();
        run(&mut world);

        assert_eq!(world.get::<Ride>(ride).expect("ride").status, RideStatus::Completed);
        assert_eq!(world.resource::<RideTelemetry>().completed_rides.len(), 1);
        assert!(world.resource::<SimulationClock>().is_empty());
    }
}
