#![allow(dead_code)]

use bevy_ecs::prelude::World;
use ride_core::geo::Coordinate;
use ride_core::matching::MatchingAlgorithmKind;
use ride_core::runner::initialize_simulation;
use ride_core::scenario::{build_scenario, ScenarioParams, DEFAULT_CENTER};

/// Builder configuration for reproducible test worlds.
#[derive(Clone, Debug)]
pub struct TestWorldConfig {
    pub seed: u64,
    pub center: Coordinate,
    pub num_drivers: usize,
    pub spawn_radius_m: f64,
    pub drift_step: f64,
    pub match_delay_ms: (u64, u64),
    pub matching: MatchingAlgorithmKind,
    pub start_ticks: bool,
}

impl Default for TestWorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            center: DEFAULT_CENTER,
            num_drivers: 0,
            spawn_radius_m: 3000.0,
            // Fast enough that a ride finishes within a few simulated minutes.
            drift_step: 0.2,
            match_delay_ms: (1500, 3000),
            matching: MatchingAlgorithmKind::Nearest,
            start_ticks: true,
        }
    }
}

/// Helper that populates the ECS world through `build_scenario`.
#[derive(Debug, Default)]
pub struct TestWorldBuilder {
    config: TestWorldConfig,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn with_center(mut self, center: Coordinate) -> Self {
        self.config.center = center;
        self
    }

    /// Generate a mock fleet around the center (default: none).
    pub fn with_generated_drivers(mut self, count: usize, radius_m: f64) -> Self {
        self.config.num_drivers = count;
        self.config.spawn_radius_m = radius_m;
        self
    }

    pub fn with_drift_step(mut self, step: f64) -> Self {
        self.config.drift_step = step;
        self
    }

    pub fn with_match_delay_ms(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.config.match_delay_ms = (min_ms, max_ms);
        self
    }

    pub fn with_matching(mut self, matching: MatchingAlgorithmKind) -> Self {
        self.config.matching = matching;
        self
    }

    /// Leave the position tick unscheduled so drivers never move.
    pub fn without_ticks(mut self) -> Self {
        self.config.start_ticks = false;
        self
    }

    pub fn params(&self) -> ScenarioParams {
        let c = &self.config;
        ScenarioParams::default()
            .with_seed(c.seed)
            .with_center(c.center)
            .with_drivers(c.num_drivers)
            .with_spawn_radius_m(c.spawn_radius_m)
            .with_drift_step(c.drift_step)
            .with_match_delay_ms(c.match_delay_ms.0, c.match_delay_ms.1)
            .with_matching(c.matching)
    }

    pub fn build(self) -> World {
        let mut world = World::new();
        build_scenario(&mut world, self.params());
        if self.config.start_ticks {
            initialize_simulation(&mut world);
        }
        world
    }
}
