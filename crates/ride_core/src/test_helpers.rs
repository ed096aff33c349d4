//! Test helpers for common test setup and utilities.
//!
//! This module provides shared test utilities to reduce duplication across test files.

use bevy_ecs::prelude::{Entity, World};

use crate::ecs::{Driver, DriverId, Position};
use crate::geo::{Coordinate, METERS_PER_DEGREE_LAT};
use crate::registry::{DriverRegistry, DRIVER_NAMES, VEHICLES};
use crate::scenario::{build_scenario, ScenarioParams, DEFAULT_CENTER};

/// The default map center used as the shared test geography.
pub fn test_center() -> Coordinate {
    DEFAULT_CENTER
}

/// A pickup point a few hundred meters from the center.
pub fn test_pickup() -> Coordinate {
    Coordinate::new(-9.4400, 147.1800)
}

/// A dropoff point roughly 1.5 km from [`test_pickup`].
pub fn test_dropoff() -> Coordinate {
    Coordinate::new(-9.4500, 147.1900)
}

/// `meters` due north of `origin`.
pub fn offset_north(origin: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(origin.lat + meters / METERS_PER_DEGREE_LAT, origin.lng)
}

/// Create a test world with every scenario resource and no drivers.
///
/// For fleets, use [`spawn_test_driver`] or the full `build_scenario` function.
pub fn create_test_world() -> World {
    let mut world = World::new();
    build_scenario(
        &mut world,
        ScenarioParams::default().with_seed(1).with_drivers(0),
    );
    world
}

/// Spawns and registers a free driver at `position`. Ids follow registry order.
pub fn spawn_test_driver(world: &mut World, position: Coordinate) -> (DriverId, Entity) {
    let index = world
        .get_resource::<DriverRegistry>()
        .map(|r| r.len())
        .unwrap_or(0);
    let id = DriverId(index as u32);
    let driver = Driver::new(
        id,
        DRIVER_NAMES[index % DRIVER_NAMES.len()],
        VEHICLES[index % VEHICLES.len()],
    );
    let entity = world.spawn((driver, Position(position))).id();
    world
        .get_resource_or_insert_with(DriverRegistry::default)
        .register(id, entity);
    (id, entity)
}
