//! Reverse geocoding for pickup/dropoff labels.
//!
//! The [`Geocoder`] is stored as a boxed ECS resource like the route provider.
//! [`place_label`] never fails: when the geocoder cannot answer, the label is
//! the coordinate itself.

use std::fmt;

use bevy_ecs::prelude::Resource;

use crate::geo::{Coordinate, CoordinateError};
use crate::scenario::ServiceConfig;

#[derive(Debug)]
pub enum GeocodeError {
    InvalidCoordinate(CoordinateError),
    /// No geocoding backend is configured.
    Unavailable,
    #[cfg(feature = "http")]
    Http(reqwest::Error),
    Api(String),
    /// The backend answered without a usable place name.
    MissingName,
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeError::InvalidCoordinate(err) => write!(f, "cannot geocode: {err}"),
            GeocodeError::Unavailable => f.write_str("no geocoding service configured"),
            #[cfg(feature = "http")]
            GeocodeError::Http(err) => write!(f, "geocoding request failed: {err}"),
            GeocodeError::Api(msg) => write!(f, "geocoding service error: {msg}"),
            GeocodeError::MissingName => f.write_str("geocoding service returned no place name"),
        }
    }
}

impl std::error::Error for GeocodeError {}

impl From<CoordinateError> for GeocodeError {
    fn from(err: CoordinateError) -> Self {
        GeocodeError::InvalidCoordinate(err)
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::Http(err)
    }
}

pub trait Geocoder: Send + Sync {
    fn reverse(&self, coordinate: Coordinate) -> Result<String, GeocodeError>;
}

#[derive(Resource)]
pub struct GeocoderResource(pub Box<dyn Geocoder>);

impl Default for GeocoderResource {
    fn default() -> Self {
        Self(Box::new(OfflineGeocoder))
    }
}

/// Always unavailable; every label falls back to coordinates.
pub struct OfflineGeocoder;

impl Geocoder for OfflineGeocoder {
    fn reverse(&self, coordinate: Coordinate) -> Result<String, GeocodeError> {
        coordinate.validate()?;
        Err(GeocodeError::Unavailable)
    }
}

/// `Location (<lat>, <lng>)` with six decimals.
pub fn coordinate_label(coordinate: Coordinate) -> String {
    format!("Location ({:.6}, {:.6})", coordinate.lat, coordinate.lng)
}

/// Human-readable label for `coordinate`, falling back to [`coordinate_label`].
pub fn place_label(geocoder: &dyn Geocoder, coordinate: Coordinate) -> String {
    match geocoder.reverse(coordinate) {
        Ok(name) => name,
        Err(GeocodeError::Unavailable) => coordinate_label(coordinate),
        Err(err) => {
            log::warn!("reverse geocoding {coordinate} failed: {err}");
            coordinate_label(coordinate)
        }
    }
}

#[cfg(feature = "http")]
pub mod nominatim {
    use super::*;
    use reqwest::blocking::Client;
    use serde::Deserialize;
    use std::time::Duration;

    /// Reverse geocoding through a Nominatim `/reverse` endpoint.
    pub struct NominatimGeocoder {
        client: Client,
        endpoint: String,
    }

    impl NominatimGeocoder {
        pub fn new(endpoint: &str) -> Result<Self, GeocodeError> {
            // Nominatim's usage policy requires an identifying agent.
            let client = Client::builder()
                .timeout(Duration::from_secs(5))
                .user_agent(concat!("ride_core/", env!("CARGO_PKG_VERSION")))
                .build()?;
            Ok(Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            })
        }
    }

    #[derive(Deserialize)]
    pub(crate) struct ReverseResponse {
        #[serde(default)]
        pub(crate) display_name: Option<String>,
    }

    pub(crate) fn parse_response(resp: ReverseResponse) -> Result<String, GeocodeError> {
        resp.display_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(GeocodeError::MissingName)
    }

    impl Geocoder for NominatimGeocoder {
        fn reverse(&self, coordinate: Coordinate) -> Result<String, GeocodeError> {
            let coordinate = coordinate.validate()?;
            let url = format!(
                "{}/reverse?format=json&lat={}&lon={}",
                self.endpoint, coordinate.lat, coordinate.lng
            );
            let resp = self.client.get(&url).send()?;
            let status = resp.status();
            if !status.is_success() {
                return Err(GeocodeError::Api(format!("HTTP {status}")));
            }
            parse_response(resp.json()?)
        }
    }

}

pub fn build_geocoder(config: &ServiceConfig) -> Box<dyn Geocoder> {
    match &config.nominatim_endpoint {
        #[cfg(feature = "http")]
        Some(endpoint) => match nominatim::NominatimGeocoder::new(endpoint) {
            Ok(geocoder) => Box::new(geocoder),
            Err(err) => {
                log::warn!("failed to build geocoding client ({err}); geocoding offline");
                Box::new(OfflineGeocoder)
            }
        },
        #[cfg(not(feature = "http"))]
        Some(_) => {
            log::warn!("geocoding endpoint configured but the `http` feature is disabled");
            Box::new(OfflineGeocoder)
        }
        None => Box::new(OfflineGeocoder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGeocoder(&'static str);

    impl Geocoder for FixedGeocoder {
        fn reverse(&self, _coordinate: Coordinate) -> Result<String, GeocodeError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenGeocoder;

    impl Geocoder for BrokenGeocoder {
        fn reverse(&self, _coordinate: Coordinate) -> Result<String, GeocodeError> {
            Err(GeocodeError::Api("HTTP 429 Too Many Requests".to_string()))
        }
    }

    #[test]
    fn offline_label_is_the_coordinate() {
        let label = place_label(&OfflineGeocoder, Coordinate::new(-9.44, 147.18));
        assert_eq!(label, "Location (-9.440000, 147.180000)");
    }

    #[test]
    fn failures_fall_back_to_coordinates() {
        let label = place_label(&BrokenGeocoder, Coordinate::new(-9.4438, 147.1803));
        assert_eq!(label, "Location (-9.443800, 147.180300)");
    }

    #[test]
    fn successful_lookup_is_used_verbatim() {
        let label = place_label(&FixedGeocoder("Boroko"), Coordinate::new(-9.47, 147.2));
        assert_eq!(label, "Boroko");
    }

    #[test]
    fn offline_rejects_invalid_coordinates() {
        assert!(matches!(
            OfflineGeocoder.reverse(Coordinate::new(f64::NAN, 0.0)),
            Err(GeocodeError::InvalidCoordinate(_))
        ));
    }
}
