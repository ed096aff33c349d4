pub mod matching;
pub mod movement;
pub mod proximity;
pub mod telemetry_snapshot;

#[cfg(test)]
mod end_to_end_tests {
    use bevy_ecs::prelude::World;

    use crate::ecs::{Driver, Ride, RideStatus};
    use crate::geo::Coordinate;
    use crate::lifecycle::RideStage;
    use crate::registry::drivers_in_order;
    use crate::runner::{initialize_simulation, run_until, simulation_schedule};
    use crate::scenario::{build_scenario, ScenarioParams};
    use crate::session::{active_ride, request_ride_between, RiderSession};
    use crate::telemetry::RideTelemetry;

    const PICKUP: Coordinate = Coordinate::new(-9.4400, 147.1800);
    const DROPOFF: Coordinate = Coordinate::new(-9.4450, 147.1850);

    #[test]
    fn simulates_one_ride_end_to_end() {
        let mut world = World::new();
        let params = ScenarioParams::default()
            .with_seed(42)
            .with_drivers(3)
            .with_spawn_radius_m(1500.0)
            .with_drift_step(0.2);
        build_scenario(&mut world, params);
        initialize_simulation(&mut world);

        request_ride_between(&mut world, PICKUP, DROPOFF).expect("request");
        let mut schedule = simulation_schedule();
        run_until(&mut world, &mut schedule, 10 * 60 * 1000);

        let (_, ride) = active_ride(&world).expect("ride");
        assert_eq!(ride.status, RideStatus::Completed);
        assert_eq!(world.resource::<RiderSession>().stage, RideStage::Idle);
        let driver_entity = ride.driver.expect("driver");
        let driver = world.get::<Driver>(driver_entity).expect("driver");
        assert!(driver.is_free());
        assert!(drivers_in_order(&world).iter().all(|v| v.driver.is_free()));

        let telemetry = world.resource::<RideTelemetry>();
        assert_eq!(telemetry.completed_rides.len(), 1);
        let record = &telemetry.completed_rides[0];
        assert!(record.requested_at <= record.matched_at);
        assert!(record.matched_at <= record.picked_up_at);
        assert!(record.picked_up_at <= record.completed_at);
        assert!((1500..=3000).contains(&record.time_to_match()));

        let rides = world.query::<&Ride>().iter(&world).count();
        assert_eq!(rides, 1);
    }
}
