//! Scenario setup: configuration resources and world construction.
//!
//! A scenario is one rider session over a fixed fleet of mock drivers seeded
//! around a center point.

mod build;
mod params;

pub use build::{build_scenario, install_services};
pub use params::{
    DispatchLatency, MovementConfig, ProximityConfig, ScenarioError, ScenarioParams,
    ServiceConfig, SimulationEndTimeMs, DEFAULT_CENTER,
};
