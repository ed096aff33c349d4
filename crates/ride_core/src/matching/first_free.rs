use bevy_ecs::prelude::Entity;

use crate::geo::Coordinate;

use super::algorithm::MatchingAlgorithm;
use super::types::MatchCandidate;

/// Baseline matching: the first free driver with a usable position, ignoring
/// distance entirely. Deterministic, handy for tests and comparisons.
#[derive(Debug, Default)]
pub struct FirstFreeMatching;

impl MatchingAlgorithm for FirstFreeMatching {
    fn find_match(&self, _pickup: Coordinate, candidates: &[MatchCandidate]) -> Option<Entity> {
        candidates
            .iter()
            .find(|c| c.position.is_valid())
            .map(|c| c.entity)
    }
}
