//! Run one ride through the default Port Moresby scenario and print the outcome.
//!
//! Run with: cargo run -p ride_core --example scenario_run

use bevy_ecs::prelude::World;
use ride_core::clock::{SimulationClock, ONE_SEC_MS};
use ride_core::ecs::RideStatus;
use ride_core::map::{handle_map_click, render_map_frame, MapClick};
use ride_core::profiling::EventMetrics;
use ride_core::runner::{initialize_simulation, run_next_event, simulation_schedule};
use ride_core::scenario::{build_scenario, ScenarioParams};
use ride_core::session::{request_ride, ride_status};
use ride_core::telemetry::{RideTelemetry, SimSnapshots};

fn main() {
    const SEED: u64 = 123;
    const MAX_SIM_SECS: u64 = 30 * 60;

    let mut world = World::new();
    build_scenario(
        &mut world,
        ScenarioParams::default().with_seed(SEED).with_drift_step(0.05),
    );
    initialize_simulation(&mut world);

    for (lat, lng) in [(-9.4400, 147.1800), (-9.4500, 147.1900)] {
        if let Err(err) = handle_map_click(&mut world, MapClick { lat, lng }) {
            eprintln!("tap rejected: {err}");
            return;
        }
    }
    if let Err(err) = request_ride(&mut world) {
        eprintln!("request failed: {err}");
        return;
    }

    let mut schedule = simulation_schedule();
    let mut steps = 0;
    while ride_status(&world) != Some(RideStatus::Completed)
        && world.resource::<SimulationClock>().now() < MAX_SIM_SECS * ONE_SEC_MS
        && run_next_event(&mut world, &mut schedule)
    {
        steps += 1;
    }

    let sim_time_secs = world.resource::<SimulationClock>().now() / ONE_SEC_MS;
    println!("--- Scenario run (6 drivers, seed {SEED}) ---");
    println!("Steps executed: {steps}");
    println!("Simulation time: {sim_time_secs} s");
    println!(
        "Ride status: {}",
        ride_status(&world).map(|s| s.to_string()).unwrap_or_else(|| "none".into())
    );

    let telemetry = world.resource::<RideTelemetry>();
    for r in &telemetry.completed_rides {
        println!(
            "  {} driver={}  time_to_match={} s  time_to_pickup={} s  trip_duration={} s",
            r.ride_id,
            r.driver_id,
            r.time_to_match() / ONE_SEC_MS,
            r.time_to_pickup() / ONE_SEC_MS,
            r.trip_duration() / ONE_SEC_MS,
        );
    }
    println!("Snapshots captured: {}", world.resource::<SimSnapshots>().snapshots.len());

    println!("\nMap frame:");
    for marker in render_map_frame(&world).markers {
        println!("  [{:?}] {} @ {}", marker.kind, marker.label, marker.coordinate);
    }
    world.resource::<EventMetrics>().print_summary();
}
