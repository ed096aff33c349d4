//! Pluggable route providers for ride previews and estimates.
//!
//! Implementations:
//!
//! - **`StraightLineRouteProvider`**: two-point geometry with a Haversine distance
//!   and a fixed-speed duration estimate. Zero dependencies, never touches the network.
//! - **`OpenRouteServiceProvider`** (feature `http`): calls an OpenRouteService
//!   directions endpoint.
//! - **`CachedRouteProvider`**: LRU cache in front of any provider.
//! - **`FallbackRouteProvider`**: degrades to the straight-line estimate when
//!   the primary provider fails.
//!
//! The provider is stored as a `Box<dyn RouteProvider>` ECS resource, built from
//! [`ServiceConfig`] by [`build_route_provider`].

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use bevy_ecs::prelude::Resource;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::geo::{distance_meters, Coordinate, CoordinateError};
use crate::scenario::ServiceConfig;

/// Average city speed assumed by the local estimate (m/s, ~48 km/h).
pub const ESTIMATE_SPEED_MPS: f64 = 13.4;

/// Padding applied to the local duration estimate for stops and turns.
pub const ESTIMATE_DURATION_FACTOR: f64 = 1.5;

/// Default route cache capacity for remote providers.
pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 1_000;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Distance/duration pair shown to the rider before confirming.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_m: f64,
    pub duration_secs: f64,
}

/// Result of a route query between two coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Ordered route geometry, starting at the origin.
    pub waypoints: Vec<Coordinate>,
    pub distance_m: f64,
    pub duration_secs: f64,
}

impl RouteResult {
    pub fn estimate(&self) -> RouteEstimate {
        RouteEstimate {
            distance_m: self.distance_m,
            duration_secs: self.duration_secs,
        }
    }
}

/// Errors from a routing backend.
#[derive(Debug)]
pub enum RoutingError {
    InvalidCoordinate(CoordinateError),
    #[cfg(feature = "http")]
    Http(reqwest::Error),
    Api(String),
    NoRoute,
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::InvalidCoordinate(err) => write!(f, "invalid route endpoint: {err}"),
            #[cfg(feature = "http")]
            RoutingError::Http(err) => write!(f, "routing request failed: {err}"),
            RoutingError::Api(msg) => write!(f, "routing service error: {msg}"),
            RoutingError::NoRoute => f.write_str("routing service returned no route"),
        }
    }
}

impl std::error::Error for RoutingError {}

impl From<CoordinateError> for RoutingError {
    fn from(err: CoordinateError) -> Self {
        RoutingError::InvalidCoordinate(err)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for RoutingError {
    fn from(err: reqwest::Error) -> Self {
        RoutingError::Http(err)
    }
}

/// Trait for routing backends. Implementations must be `Send + Sync` so the
/// provider can be stored as a shared ECS resource.
pub trait RouteProvider: Send + Sync {
    fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError>;
}

/// ECS resource wrapping a boxed route provider.
#[derive(Resource)]
pub struct RouteProviderResource(pub Box<dyn RouteProvider>);

impl Default for RouteProviderResource {
    fn default() -> Self {
        Self(Box::new(StraightLineRouteProvider))
    }
}

// ---------------------------------------------------------------------------
// Straight-line provider (always available)
// ---------------------------------------------------------------------------

/// Local estimate: Haversine distance rounded to whole meters, and a
/// duration at [`ESTIMATE_SPEED_MPS`] padded by [`ESTIMATE_DURATION_FACTOR`],
/// rounded to whole seconds.
pub fn straight_line_estimate(
    from: Coordinate,
    to: Coordinate,
) -> Result<RouteEstimate, CoordinateError> {
    let from = from.validate()?;
    let to = to.validate()?;
    let distance = distance_meters(from, to);
    Ok(RouteEstimate {
        distance_m: distance.round(),
        duration_secs: (distance / ESTIMATE_SPEED_MPS * ESTIMATE_DURATION_FACTOR).round(),
    })
}

pub struct StraightLineRouteProvider;

impl RouteProvider for StraightLineRouteProvider {
    fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError> {
        let estimate = straight_line_estimate(from, to)?;
        Ok(RouteResult {
            waypoints: vec![from, to],
            distance_m: estimate.distance_m,
            duration_secs: estimate.duration_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// OpenRouteService provider (behind `http` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "http")]
pub mod ors {
    use super::*;
    use reqwest::blocking::Client;
    use std::time::Duration;

    /// Routes via the OpenRouteService `driving-car` GeoJSON endpoint.
    pub struct OpenRouteServiceProvider {
        client: Client,
        endpoint: String,
        api_key: String,
    }

    impl OpenRouteServiceProvider {
        pub fn new(endpoint: &str, api_key: &str) -> Result<Self, RoutingError> {
            let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
            Ok(Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
            })
        }
    }

    /// Minimal ORS GeoJSON response structures.
    #[derive(Deserialize)]
    pub(crate) struct OrsResponse {
        #[serde(default)]
        pub(crate) features: Vec<OrsFeature>,
    }

    #[derive(Deserialize)]
    pub(crate) struct OrsFeature {
        pub(crate) geometry: OrsGeometry,
        pub(crate) properties: OrsProperties,
    }

    #[derive(Deserialize)]
    pub(crate) struct OrsGeometry {
        pub(crate) coordinates: Vec<Vec<f64>>, // [lng, lat(, elevation)]
    }

    #[derive(Deserialize)]
    pub(crate) struct OrsProperties {
        pub(crate) summary: OrsSummary,
    }

    #[derive(Deserialize)]
    pub(crate) struct OrsSummary {
        // ORS omits zero-valued fields.
        #[serde(default)]
        pub(crate) distance: f64, // metres
        #[serde(default)]
        pub(crate) duration: f64, // seconds
    }

    pub(crate) fn parse_response(resp: OrsResponse) -> Result<RouteResult, RoutingError> {
        let feature = resp.features.into_iter().next().ok_or(RoutingError::NoRoute)?;
        let waypoints: Vec<Coordinate> = feature
            .geometry
            .coordinates
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| Coordinate::new(c[1], c[0])) // ORS returns [lng, lat], we store (lat, lng)
            .filter(Coordinate::is_valid)
            .collect();
        if waypoints.is_empty() {
            return Err(RoutingError::NoRoute);
        }
        Ok(RouteResult {
            waypoints,
            distance_m: feature.properties.summary.distance,
            duration_secs: feature.properties.summary.duration,
        })
    }

    impl RouteProvider for OpenRouteServiceProvider {
        fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError> {
            let from = from.validate()?;
            let to = to.validate()?;
            let url = format!("{}/v2/directions/driving-car/geojson", self.endpoint);
            let body = serde_json::json!({
                "coordinates": [[from.lng, from.lat], [to.lng, to.lat]],
            });

            let resp = self
                .client
                .post(&url)
                .header("Authorization", &self.api_key)
                .json(&body)
                .send()?;
            let status = resp.status();
            if !status.is_success() {
                return Err(RoutingError::Api(format!("HTTP {status}")));
            }
            parse_response(resp.json()?)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parses_geojson_route() {
            let json = r#"{
                "features": [{
                    "geometry": { "coordinates": [[147.18, -9.44, 12.0], [147.185, -9.445], [147.19, -9.45]] },
                    "properties": { "summary": { "distance": 1873.4, "duration": 245.1 } }
                }]
            }"#;
            let resp: OrsResponse = serde_json::from_str(json).expect("json");
            let route = parse_response(resp).expect("route");
            assert_eq!(route.waypoints.len(), 3);
            assert_eq!(route.waypoints[0], Coordinate::new(-9.44, 147.18));
            assert_eq!(route.distance_m, 1873.4);
            assert_eq!(route.duration_secs, 245.1);
        }

        #[test]
        fn empty_feature_list_is_no_route() {
            let resp: OrsResponse = serde_json::from_str(r#"{ "features": [] }"#).expect("json");
            assert!(matches!(parse_response(resp), Err(RoutingError::NoRoute)));
        }
    }
}

// ---------------------------------------------------------------------------
// Wrappers
// ---------------------------------------------------------------------------

/// Answers from the straight-line estimate when the primary provider fails.
pub struct FallbackRouteProvider {
    primary: Box<dyn RouteProvider>,
}

impl FallbackRouteProvider {
    pub fn new(primary: Box<dyn RouteProvider>) -> Self {
        Self { primary }
    }
}

impl RouteProvider for FallbackRouteProvider {
    fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError> {
        match self.primary.route(from, to) {
            Ok(route) => Ok(route),
            Err(err @ RoutingError::InvalidCoordinate(_)) => Err(err),
            Err(err) => {
                log::warn!("route lookup failed ({err}); using straight-line estimate");
                StraightLineRouteProvider.route(from, to)
            }
        }
    }
}

/// LRU-cached wrapper around any [`RouteProvider`].
///
/// Cache key is the bit pattern of both endpoints (directional). Errors are
/// never cached.
pub struct CachedRouteProvider {
    inner: Box<dyn RouteProvider>,
    cache: Mutex<LruCache<[u64; 4], RouteResult>>,
}

impl CachedRouteProvider {
    pub fn new(inner: Box<dyn RouteProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn key(from: Coordinate, to: Coordinate) -> [u64; 4] {
        [
            from.lat.to_bits(),
            from.lng.to_bits(),
            to.lat.to_bits(),
            to.lng.to_bits(),
        ]
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl RouteProvider for CachedRouteProvider {
    fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteResult, RoutingError> {
        let key = Self::key(from, to);

        // Fast path: cache hit
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return Ok(cached.clone());
            }
        }

        let route = self.inner.route(from, to)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, route.clone());
        }
        Ok(route)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Construct a boxed [`RouteProvider`] from the service configuration.
///
/// Without an OpenRouteService endpoint and key (or without the `http`
/// feature) this is the straight-line provider. A remote provider is cached
/// and then wrapped in a [`FallbackRouteProvider`].
pub fn build_route_provider(config: &ServiceConfig) -> Box<dyn RouteProvider> {
    match (&config.ors_endpoint, &config.ors_api_key) {
        #[cfg(feature = "http")]
        (Some(endpoint), Some(api_key)) => {
            match ors::OpenRouteServiceProvider::new(endpoint, api_key) {
                Ok(provider) => {
                    let capacity = if config.route_cache_capacity == 0 {
                        DEFAULT_ROUTE_CACHE_CAPACITY
                    } else {
                        config.route_cache_capacity
                    };
                    let cached = CachedRouteProvider::new(Box::new(provider), capacity);
                    Box::new(FallbackRouteProvider::new(Box::new(cached)))
                }
                Err(err) => {
                    log::warn!("failed to build routing client ({err}); routing offline");
                    Box::new(StraightLineRouteProvider)
                }
            }
        }
        #[cfg(not(feature = "http"))]
        (Some(_), Some(_)) => {
            log::warn!("routing endpoint configured but the `http` feature is disabled; routing offline");
            Box::new(StraightLineRouteProvider)
        }
        _ => Box::new(StraightLineRouteProvider),
    }
}
