#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic primitives shared by every safe-route crate.
//!
//! [`GeoPoint`] can only be built through a validating constructor, so any
//! value that reaches distance or graph code is guaranteed to be finite and
//! within WGS84 bounds. Invalid coordinates are rejected here, before they
//! can corrupt downstream computations.

use geo::{Distance, HaversineMeasure};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine on a sphere of [`EARTH_RADIUS_KM`], so distances come out in km.
const SPHERE_KM: HaversineMeasure = HaversineMeasure::new(EARTH_RADIUS_KM);

/// Error returned when a coordinate pair is malformed.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The coordinate is NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NonFinite {
        /// Which coordinate component was rejected.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The coordinate is finite but outside its valid range.
    #[error("{field} {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Which coordinate component was rejected.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
}

/// A validated WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

/// Unvalidated wire shape of a [`GeoPoint`].
#[derive(Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = ValidationError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lng)
    }
}

impl GeoPoint {
    /// Creates a point after checking both components.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if either component is NaN, infinite, or
    /// outside `[-90, 90]` / `[-180, 180]`.
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        check("lat", lat, 90.0)?;
        check("lng", lng, 180.0)?;
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Returns `true` if `other` lies inside the square box of half-width
    /// `epsilon_deg` around this point (both deltas strictly below epsilon).
    #[must_use]
    pub fn within_box(&self, other: &Self, epsilon_deg: f64) -> bool {
        (self.lat - other.lat).abs() < epsilon_deg && (self.lng - other.lng).abs() < epsilon_deg
    }

    /// Great-circle distance to `other` in kilometres.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(self, other)
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        Self::new(point.lng, point.lat)
    }
}

impl From<GeoPoint> for geo::Coord<f64> {
    fn from(point: GeoPoint) -> Self {
        Self {
            x: point.lng,
            y: point.lat,
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lng)
    }
}

fn check(field: &'static str, value: f64, bound: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field, value });
    }
    if !(-bound..=bound).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: -bound,
            max: bound,
        });
    }
    Ok(())
}

/// Haversine great-circle distance between two points in kilometres.
#[must_use]
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    SPHERE_KM.distance(geo::Point::from(*a), geo::Point::from(*b))
}
