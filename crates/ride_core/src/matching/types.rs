use bevy_ecs::prelude::Entity;

use crate::ecs::DriverId;
use crate::geo::Coordinate;

/// A free driver offered to the matching algorithm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate {
    pub entity: Entity,
    pub driver_id: DriverId,
    pub position: Coordinate,
}
