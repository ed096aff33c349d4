pub mod clock;
pub mod ecs;
pub mod geo;
pub mod geocoding;
pub mod lifecycle;
pub mod map;
pub mod matching;
pub mod profiling;
pub mod registry;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod systems;
pub mod telemetry;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
