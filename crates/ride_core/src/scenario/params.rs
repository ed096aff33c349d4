use std::fmt;
use std::fs;
use std::path::Path;

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::matching::MatchingAlgorithmKind;

/// Default map center: Port Moresby, Papua New Guinea.
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: -9.43869006941101,
    lng: 147.1810054779053,
};

/// Simulation end time in milliseconds. When set, the runner stops processing events
/// once the next event would be at or after this timestamp.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndTimeMs(pub u64);

/// Driver drift per position tick.
#[derive(Debug, Clone, Copy, Resource)]
pub struct MovementConfig {
    /// Fraction of the remaining distance covered per tick, in `[0, 1]`.
    pub drift_step: f64,
    pub tick_interval_ms: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            drift_step: 0.0004,
            tick_interval_ms: 1000,
        }
    }
}

/// Pickup/dropoff arrival detection.
#[derive(Debug, Clone, Copy, Resource)]
pub struct ProximityConfig {
    /// A driver closer than this (meters) has arrived.
    pub threshold_m: f64,
    pub poll_interval_ms: u64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            threshold_m: 40.0,
            poll_interval_ms: 1000,
        }
    }
}

/// Simulated delay before each match attempt, uniform in `[min_ms, max_ms]`.
#[derive(Resource)]
pub struct DispatchLatency {
    rng: StdRng,
    min_ms: u64,
    max_ms: u64,
}

impl DispatchLatency {
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_range(seed, 1500, 3000)
    }

    pub fn with_range(seed: Option<u64>, min_ms: u64, max_ms: u64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    pub fn bounds(&self) -> (u64, u64) {
        (self.min_ms, self.max_ms)
    }

    pub fn sample_ms(&mut self) -> u64 {
        self.rng.gen_range(self.min_ms..=self.max_ms)
    }
}

/// External routing/geocoding endpoints. Empty fields mean "stay offline".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// OpenRouteService base URL, e.g. `https://api.openrouteservice.org`.
    pub ors_endpoint: Option<String>,
    pub ors_api_key: Option<String>,
    /// Nominatim base URL, e.g. `https://nominatim.openstreetmap.org`.
    pub nominatim_endpoint: Option<String>,
    /// Capacity of the route cache in front of the remote provider.
    pub route_cache_capacity: usize,
}

/// Errors raised while loading scenario configuration.
#[derive(Debug)]
pub enum ScenarioError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Io(err) => write!(f, "failed to read scenario file: {err}"),
            ScenarioError::Json(err) => write!(f, "invalid scenario JSON: {err}"),
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::Io(err) => Some(err),
            ScenarioError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ScenarioError {
    fn from(err: std::io::Error) -> Self {
        ScenarioError::Io(err)
    }
}

impl From<serde_json::Error> for ScenarioError {
    fn from(err: serde_json::Error) -> Self {
        ScenarioError::Json(err)
    }
}

/// Parameters for building a scenario. Every field has a default, so a JSON
/// file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub center: Coordinate,
    pub num_drivers: usize,
    /// Drivers are seeded uniformly within this radius of `center`.
    pub spawn_radius_m: f64,
    /// Random seed for reproducibility (optional; if None, uses entropy).
    pub seed: Option<u64>,
    pub drift_step: f64,
    pub position_tick_ms: u64,
    pub match_delay_min_ms: u64,
    pub match_delay_max_ms: u64,
    pub proximity_threshold_m: f64,
    pub proximity_poll_ms: u64,
    pub snapshot_interval_ms: u64,
    pub max_snapshots: usize,
    /// Wall-clock time (Unix ms) of simulation time 0.
    pub clock_epoch_ms: u64,
    pub matching: MatchingAlgorithmKind,
    /// Stop processing events at this simulation time, if set.
    pub end_time_ms: Option<u64>,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        let movement = MovementConfig::default();
        let proximity = ProximityConfig::default();
        Self {
            center: DEFAULT_CENTER,
            num_drivers: 6,
            spawn_radius_m: 3000.0,
            seed: None,
            drift_step: movement.drift_step,
            position_tick_ms: movement.tick_interval_ms,
            match_delay_min_ms: 1500,
            match_delay_max_ms: 3000,
            proximity_threshold_m: proximity.threshold_m,
            proximity_poll_ms: proximity.poll_interval_ms,
            snapshot_interval_ms: 1000,
            max_snapshots: 10_000,
            clock_epoch_ms: 0,
            matching: MatchingAlgorithmKind::Nearest,
            end_time_ms: None,
        }
    }
}

impl ScenarioParams {
    pub fn from_json_str(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_center(mut self, center: Coordinate) -> Self {
        self.center = center;
        self
    }

    pub fn with_drivers(mut self, count: usize) -> Self {
        self.num_drivers = count;
        self
    }

    pub fn with_spawn_radius_m(mut self, radius_m: f64) -> Self {
        self.spawn_radius_m = radius_m;
        self
    }

    pub fn with_drift_step(mut self, step: f64) -> Self {
        self.drift_step = step;
        self
    }

    /// Dispatch latency bounds for each match attempt.
    pub fn with_match_delay_ms(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.match_delay_min_ms = min_ms;
        self.match_delay_max_ms = max_ms;
        self
    }

    pub fn with_proximity_threshold_m(mut self, threshold_m: f64) -> Self {
        self.proximity_threshold_m = threshold_m;
        self
    }

    pub fn with_matching(mut self, matching: MatchingAlgorithmKind) -> Self {
        self.matching = matching;
        self
    }

    pub fn with_simulation_end_time_ms(mut self, end_time_ms: u64) -> Self {
        self.end_time_ms = Some(end_time_ms);
        self
    }

    pub fn movement_config(&self) -> MovementConfig {
        MovementConfig {
            drift_step: self.drift_step,
            tick_interval_ms: self.position_tick_ms.max(1),
        }
    }

    pub fn proximity_config(&self) -> ProximityConfig {
        ProximityConfig {
            threshold_m: self.proximity_threshold_m,
            poll_interval_ms: self.proximity_poll_ms.max(1),
        }
    }
}
