pub mod algorithm;
pub mod types;
pub mod first_free;
pub mod nearest;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

pub use algorithm::MatchingAlgorithm;
pub use first_free::FirstFreeMatching;
pub use nearest::NearestDriverMatching;
pub use types::MatchCandidate;

/// Which matching algorithm a scenario uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingAlgorithmKind {
    #[default]
    Nearest,
    FirstFree,
}

/// Resource wrapper for the matching algorithm trait object.
#[derive(Resource)]
pub struct MatchingAlgorithmResource(pub Box<dyn MatchingAlgorithm>);

impl MatchingAlgorithmResource {
    pub fn new(algorithm: Box<dyn MatchingAlgorithm>) -> Self {
        Self(algorithm)
    }

    pub fn from_kind(kind: MatchingAlgorithmKind) -> Self {
        match kind {
            MatchingAlgorithmKind::Nearest => Self::new(Box::new(NearestDriverMatching)),
            MatchingAlgorithmKind::FirstFree => Self::new(Box::new(FirstFreeMatching)),
        }
    }
}

impl std::ops::Deref for MatchingAlgorithmResource {
    type Target = dyn MatchingAlgorithm;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
