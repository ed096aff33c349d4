use bevy_ecs::prelude::World;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::SimulationClock;
use crate::geocoding::{build_geocoder, GeocoderResource};
use crate::map::LocationSelection;
use crate::matching::MatchingAlgorithmResource;
use crate::profiling::EventMetrics;
use crate::registry::{generate_drivers, DriverRegistry, DriverRng};
use crate::routing::{build_route_provider, RouteProviderResource};
use crate::scenario::params::{DispatchLatency, ScenarioParams, ServiceConfig, SimulationEndTimeMs};
use crate::session::RiderSession;
use crate::telemetry::{RideTelemetry, SimSnapshotConfig, SimSnapshots};

/// Inserts every resource the schedule needs and spawns the driver fleet.
///
/// Routing and geocoding start offline; call [`install_services`] to use
/// remote providers. Each random stream is derived from the seed so runs with
/// the same seed are identical.
pub fn build_scenario(world: &mut World, params: ScenarioParams) {
    world.insert_resource(SimulationClock::with_epoch(params.clock_epoch_ms));

    world.insert_resource(RideTelemetry::default());
    world.insert_resource(SimSnapshotConfig {
        interval_ms: params.snapshot_interval_ms.max(1),
        max_snapshots: params.max_snapshots,
    });
    world.insert_resource(SimSnapshots::default());
    world.insert_resource(EventMetrics::default());

    if let Some(end_ms) = params.end_time_ms {
        world.insert_resource(SimulationEndTimeMs(end_ms));
    }

    world.insert_resource(params.movement_config());
    world.insert_resource(params.proximity_config());
    world.insert_resource(DispatchLatency::with_range(
        params.seed.map(|seed| seed ^ 0x5eed_cafe),
        params.match_delay_min_ms,
        params.match_delay_max_ms,
    ));
    world.insert_resource(MatchingAlgorithmResource::from_kind(params.matching));

    world.insert_resource(RiderSession::default());
    world.insert_resource(LocationSelection::default());
    world.insert_resource(RouteProviderResource::default());
    world.insert_resource(GeocoderResource::default());

    world.insert_resource(DriverRegistry::default());
    world.insert_resource(DriverRng::new(params.seed.map(|seed| seed ^ 0xdead_beef)));
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    generate_drivers(
        world,
        params.center,
        params.num_drivers,
        params.spawn_radius_m,
        &mut rng,
    );
    log::info!(
        "scenario built: {} drivers within {} m of {}",
        params.num_drivers,
        params.spawn_radius_m,
        params.center
    );
}

/// Replaces the offline route provider and geocoder with the configured
/// remote services.
pub fn install_services(world: &mut World, config: &ServiceConfig) {
    world.insert_resource(RouteProviderResource(build_route_provider(config)));
    world.insert_resource(GeocoderResource(build_geocoder(config)));
}
