//! Geographic location value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic location with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude in degrees (-90 to 90)
    latitude: f64,
    /// Longitude in degrees (-180 to 180)
    longitude: f64,
}

/// Error type for invalid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidCoordinates {
    /// Latitude is not a finite number in [-90, 90]
    Latitude,
    /// Longitude is not a finite number in [-180, 180]
    Longitude,
}

impl fmt::Display for InvalidCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latitude => write!(f, "Latitude must be a number between -90 and 90"),
            Self::Longitude => write!(f, "Longitude must be a number between -180 and 180"),
        }
    }
}

impl std::error::Error for InvalidCoordinates {}

impl GeoLocation {
    /// Create a new location with validation
    ///
    /// NaN and infinite values are rejected along with out-of-range ones.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCoordinates` if latitude is not in [-90, 90]
    /// or longitude is not in [-180, 180]
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinates> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(InvalidCoordinates::Latitude);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidCoordinates::Longitude);
        }
        // `+ 0.0` folds -0.0 into 0.0 so equal points compare and key identically
        Ok(Self {
            latitude: latitude + 0.0,
            longitude: longitude + 0.0,
        })
    }

    /// Create a location without validation (for trusted sources)
    ///
    /// Caller must ensure latitude is in [-90, 90] and longitude in [-180, 180]
    #[must_use]
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Get the latitude
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Get the longitude
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Calculate the great-circle distance to another location in kilometers
    ///
    /// Uses the Haversine formula with a mean Earth radius of 6371 km.
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Haversine distance in kilometers between two raw coordinate pairs
#[must_use]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (lat1_rad.cos() * lat2_rad.cos()).mul_add(
        (delta_lng / 2.0).sin().powi(2),
        (delta_lat / 2.0).sin().powi(2),
    )
    // Rounding can push `a` just past 1 for antipodal points
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

impl fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}
