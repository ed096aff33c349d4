use bevy_ecs::prelude::Entity;

use crate::geo::Coordinate;

use super::types::MatchCandidate;

/// Trait for matching algorithms that pick a driver for a waiting ride.
///
/// `candidates` holds free drivers only, in registry order. Implementations
/// must never return an entity that is not in `candidates`, which is what keeps a
/// busy driver from being double-booked.
pub trait MatchingAlgorithm: Send + Sync {
    /// Returns the chosen driver, or `None` to leave the ride searching.
    fn find_match(&self, pickup: Coordinate, candidates: &[MatchCandidate]) -> Option<Entity>;
}
