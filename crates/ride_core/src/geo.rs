//! Geo utilities: coordinate validation, distances and interpolation.
//!
//! This module provides:
//!
//! - **Coordinate**: a raw (lat, lng) pair that may or may not be valid
//! - **Validation**: `Coordinate::validate` returns an explicit [`CoordinateError`]
//! - **Distance**: Haversine distance in meters (`+inf` for invalid input)
//! - **Drift**: total interpolation toward a target that never yields a bad coordinate
//! - **Random nearby**: flat-earth offsets used to seed mock driver positions
//!
//! The arithmetic helpers never panic. Distance reports "unreachable" as
//! infinity and drift falls back to a known-good coordinate.

use std::fmt;

use h3o::{CellIndex, LatLng, Resolution};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Flat-earth approximation: meters per degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_111.0;

/// Position returned by [`drift_toward`] when neither endpoint is usable.
pub const FALLBACK_CENTER: Coordinate = Coordinate {
    lat: -9.4438,
    lng: 147.1803,
};

/// A latitude/longitude pair in degrees.
///
/// Construction does not validate; use [`Coordinate::validate`] or
/// [`is_valid_coordinate`] before trusting the values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Why a coordinate was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    NonFiniteLatitude(f64),
    NonFiniteLongitude(f64),
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateError::NonFiniteLatitude(v) => write!(f, "latitude {v} is not finite"),
            CoordinateError::NonFiniteLongitude(v) => write!(f, "longitude {v} is not finite"),
        }
    }
}

impl std::error::Error for CoordinateError {}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        LatLng::new(self.lat, self.lng).is_ok()
    }

    /// Returns the coordinate unchanged when both components are finite.
    pub fn validate(self) -> Result<Coordinate, CoordinateError> {
        if !self.lat.is_finite() {
            return Err(CoordinateError::NonFiniteLatitude(self.lat));
        }
        if !self.lng.is_finite() {
            return Err(CoordinateError::NonFiniteLongitude(self.lng));
        }
        Ok(self)
    }

    /// H3 resolution-9 cell containing this coordinate, if it is valid.
    pub fn to_cell(&self) -> Option<CellIndex> {
        LatLng::new(self.lat, self.lng)
            .ok()
            .map(|ll| ll.to_cell(Resolution::Nine))
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

pub fn is_valid_coordinate(c: &Coordinate) -> bool {
    c.is_valid()
}

/// Great-circle distance in meters.
///
/// Returns `f64::INFINITY` when either side is invalid; callers treat that as
/// "not comparable" and drop the candidate from nearest-neighbor searches.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    if !a.is_valid() || !b.is_valid() {
        return f64::INFINITY;
    }
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlng = (dlng * 0.5).sin();
    // Rounding can push near-antipodal points just past 1.
    let h = (sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng).clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Moves `from` a fraction `step` of the way toward `to` along a straight line.
///
/// `step` is clamped to `[0, 1]`; a NaN step means no movement. If `to` is
/// invalid the result is `from`, if `from` is invalid the result is `to`, and if
/// both are invalid the result is [`FALLBACK_CENTER`]. The returned coordinate
/// is always finite.
pub fn drift_toward(from: Coordinate, to: Coordinate, step: f64) -> Coordinate {
    match (from.is_valid(), to.is_valid()) {
        (false, false) => {
            log::warn!("drift_toward: from and to invalid, using fallback center");
            return FALLBACK_CENTER;
        }
        (false, true) => {
            log::warn!("drift_toward: from invalid, snapping to target");
            return to;
        }
        (true, false) => {
            log::warn!("drift_toward: target invalid, staying at {from}");
            return from;
        }
        (true, true) => {}
    }

    let s = if step.is_nan() { 0.0 } else { step.clamp(0.0, 1.0) };
    let next = Coordinate {
        lat: from.lat + (to.lat - from.lat) * s,
        lng: from.lng + (to.lng - from.lng) * s,
    };
    if next.is_valid() {
        next
    } else {
        log::warn!("drift_toward: interpolation overflowed, staying at {from}");
        from
    }
}

/// Samples a coordinate within `radius_m` of `center` (flat-earth approximation).
///
/// A non-positive or non-finite radius returns `center` unchanged; an invalid
/// center is replaced with [`FALLBACK_CENTER`]. Only meant for seeding mock
/// positions.
pub fn random_nearby<R: Rng + ?Sized>(center: Coordinate, radius_m: f64, rng: &mut R) -> Coordinate {
    let center = if center.is_valid() {
        center
    } else {
        log::warn!("random_nearby: invalid center, using fallback center");
        FALLBACK_CENTER
    };
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return center;
    }

    let distance = rng.gen_range(0.0..radius_m);
    let bearing = rng.gen_range(0.0..std::f64::consts::TAU);
    let meters_per_degree_lng = {
        let scaled = METERS_PER_DEGREE_LAT * center.lat.to_radians().cos();
        // Degenerate near the poles.
        if scaled.abs() < 1e-6 {
            METERS_PER_DEGREE_LAT
        } else {
            scaled
        }
    };

    Coordinate {
        lat: center.lat + distance * bearing.cos() / METERS_PER_DEGREE_LAT,
        lng: center.lng + distance * bearing.sin() / meters_per_degree_lng,
    }
}
