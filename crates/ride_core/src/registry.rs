//! Mock driver registry: a fixed batch of simulated drivers for the session.
//!
//! Drivers are ECS entities carrying [`Driver`] and [`Position`]. The
//! [`DriverRegistry`] resource remembers creation order, which doubles as the
//! tie-break order for matching. Movement itself happens in
//! [`crate::systems::movement`].

use bevy_ecs::prelude::{Entity, Resource, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ecs::{Driver, DriverId, Position, Ride};
use crate::geo::{random_nearby, Coordinate, FALLBACK_CENTER};
use crate::session::RiderSession;

pub const DRIVER_NAMES: [&str; 7] = ["Aeta", "Bena", "Cadi", "Dalu", "Ena", "Fero", "Gina"];

pub const VEHICLES: [&str; 5] = [
    "Toyota Vios",
    "Honda City",
    "Nissan Almera",
    "Mitsubishi Lancer",
    "Mazda 2",
];

/// Radius used by [`randomize_driver_positions`] when scattering the fleet.
pub const RANDOMIZE_RADIUS_M: f64 = 5000.0;

/// Driver entities in registry (creation) order.
#[derive(Debug, Default, Resource)]
pub struct DriverRegistry {
    drivers: Vec<(DriverId, Entity)>,
}

impl DriverRegistry {
    pub fn register(&mut self, id: DriverId, entity: Entity) {
        self.drivers.push((id, entity));
    }

    pub fn entity(&self, id: DriverId) -> Option<Entity> {
        self.drivers
            .iter()
            .find(|(driver_id, _)| *driver_id == id)
            .map(|(_, entity)| *entity)
    }

    pub fn ids(&self) -> impl Iterator<Item = DriverId> + '_ {
        self.drivers.iter().map(|(id, _)| *id)
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.drivers.iter().map(|(_, entity)| *entity)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

/// RNG used for repositioning drivers after the initial batch.
#[derive(Resource)]
pub struct DriverRng(pub StdRng);

impl DriverRng {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self(rng)
    }
}

/// Spawns `count` free drivers scattered within `spawn_radius_m` of `center`.
///
/// Names and vehicles are assigned cyclically. Ids continue from whatever is
/// already registered, so calling this twice never reuses an id.
pub fn generate_drivers<R: Rng + ?Sized>(
    world: &mut World,
    center: Coordinate,
    count: usize,
    spawn_radius_m: f64,
    rng: &mut R,
) -> Vec<DriverId> {
    let start = world
        .get_resource::<DriverRegistry>()
        .map(|r| r.len())
        .unwrap_or(0);

    let mut spawned = Vec::with_capacity(count);
    for i in start..start + count {
        let id = DriverId(i as u32);
        let driver = Driver::new(
            id,
            DRIVER_NAMES[i % DRIVER_NAMES.len()],
            VEHICLES[i % VEHICLES.len()],
        );
        let position = random_nearby(center, spawn_radius_m, rng);
        let entity = world.spawn((driver, Position(position))).id();
        world
            .get_resource_or_insert_with(DriverRegistry::default)
            .register(id, entity);
        spawned.push(id);
    }
    log::debug!("generated {count} drivers around {center}");
    spawned
}

/// Marks the driver busy and heading to `target`. Unknown ids are ignored;
/// returns whether anything changed.
pub fn assign_driver(world: &mut World, id: DriverId, target: Coordinate) -> bool {
    with_driver(world, id, |driver| driver.assign(target))
}

/// Frees the driver and clears its target. Unknown ids are ignored.
pub fn release_driver(world: &mut World, id: DriverId) -> bool {
    with_driver(world, id, Driver::release)
}

fn with_driver(world: &mut World, id: DriverId, f: impl FnOnce(&mut Driver)) -> bool {
    let Some(entity) = world
        .get_resource::<DriverRegistry>()
        .and_then(|r| r.entity(id))
    else {
        return false;
    };
    let Some(mut entity_mut) = world.get_entity_mut(entity) else {
        return false;
    };
    let Some(mut driver) = entity_mut.get_mut::<Driver>() else {
        return false;
    };
    f(&mut *driver);
    true
}

/// Snapshot of one driver for panels and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverView {
    pub entity: Entity,
    pub driver: Driver,
    pub position: Coordinate,
}

/// All registered drivers in registry order.
pub fn drivers_in_order(world: &World) -> Vec<DriverView> {
    let Some(registry) = world.get_resource::<DriverRegistry>() else {
        return Vec::new();
    };
    registry
        .entities()
        .filter_map(|entity| {
            let entity_ref = world.get_entity(entity)?;
            let driver = entity_ref.get::<Driver>()?.clone();
            let position = entity_ref.get::<Position>()?.0;
            Some(DriverView {
                entity,
                driver,
                position,
            })
        })
        .collect()
}

pub fn find_driver(world: &World, id: DriverId) -> Option<DriverView> {
    drivers_in_order(world)
        .into_iter()
        .find(|view| view.driver.id == id)
}

/// Scatters every driver within `radius_m` of the first driver's position
/// (or the fallback center if that is unusable). Targets and busy flags stay.
pub fn randomize_driver_positions(world: &mut World, radius_m: f64) {
    let drivers = drivers_in_order(world);
    let anchor = drivers
        .first()
        .map(|view| view.position)
        .filter(Coordinate::is_valid)
        .unwrap_or(FALLBACK_CENTER);

    let positions: Vec<(Entity, Coordinate)> = {
        let mut rng = world.get_resource_or_insert_with(|| DriverRng::new(None));
        drivers
            .iter()
            .map(|view| (view.entity, random_nearby(anchor, radius_m, &mut rng.0)))
            .collect()
    };
    for (entity, position) in positions {
        if let Some(mut pos) = world.get_mut::<Position>(entity) {
            pos.0 = position;
        }
    }
    log::debug!("randomized {} driver positions around {anchor}", drivers.len());
}

/// Frees every driver except the one serving the active ride.
pub fn reset_busy_drivers(world: &mut World) -> usize {
    let serving = world
        .get_resource::<RiderSession>()
        .and_then(|session| session.ride)
        .and_then(|ride| world.get::<Ride>(ride))
        .filter(|ride| !ride.status.is_terminal())
        .and_then(|ride| ride.driver);

    let mut released = 0;
    for view in drivers_in_order(world) {
        if Some(view.entity) == serving || view.driver.is_free() {
            continue;
        }
        if let Some(mut driver) = world.get_mut::<Driver>(view.entity) {
            driver.release();
            released += 1;
        }
    }
    released
}
