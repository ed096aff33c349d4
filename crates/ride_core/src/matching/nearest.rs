use bevy_ecs::prelude::Entity;

use crate::geo::{distance_meters, Coordinate};

use super::algorithm::MatchingAlgorithm;
use super::types::MatchCandidate;

/// Nearest-driver matching by Haversine distance to pickup.
///
/// Candidates with an invalid position (infinite distance) are skipped. Ties go
/// to the earliest candidate, i.e. registry order wins.
#[derive(Debug, Default)]
pub struct NearestDriverMatching;

impl MatchingAlgorithm for NearestDriverMatching {
    fn find_match(&self, pickup: Coordinate, candidates: &[MatchCandidate]) -> Option<Entity> {
        let mut best: Option<(Entity, f64)> = None;
        for candidate in candidates {
            let distance = distance_meters(candidate.position, pickup);
            if !distance.is_finite() {
                continue;
            }
            // Strict `<` keeps the first of equally distant drivers.
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((candidate.entity, distance));
            }
        }
        best.map(|(entity, _)| entity)
    }
}
