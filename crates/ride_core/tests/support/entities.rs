#![allow(dead_code)]

use bevy_ecs::prelude::{Entity, World};
use ride_core::ecs::{Driver, DriverId};
use ride_core::geo::Coordinate;
use ride_core::test_helpers::{spawn_test_driver, test_center};

/// Builder for driver fixtures registered in the world's `DriverRegistry`.
#[derive(Clone, Debug)]
pub struct DriverBuilder {
    position: Coordinate,
    busy_toward: Option<Coordinate>,
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self {
            position: test_center(),
            busy_toward: None,
        }
    }
}

impl DriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Coordinate) -> Self {
        self.position = position;
        self
    }

    /// Start the driver busy, heading to `target`.
    pub fn busy_toward(mut self, target: Coordinate) -> Self {
        self.busy_toward = Some(target);
        self
    }

    pub fn spawn(self, world: &mut World) -> (DriverId, Entity) {
        let (id, entity) = spawn_test_driver(world, self.position);
        if let Some(target) = self.busy_toward {
            if let Some(mut driver) = world.get_mut::<Driver>(entity) {
                driver.assign(target);
            }
        }
        (id, entity)
    }
}
