//! Geographic bounding box value object

use serde::{Deserialize, Serialize};

/// Axis-aligned box enclosing a place, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude
    pub south: f64,
    /// Northern latitude
    pub north: f64,
    /// Western longitude
    pub west: f64,
    /// Eastern longitude
    pub east: f64,
}

impl BoundingBox {
    /// Build from the `[south, north, west, east]` ordering used by OSM services
    ///
    /// Returns `None` unless exactly four finite values are given.
    #[must_use]
    pub fn from_osm_slice(values: &[f64]) -> Option<Self> {
        match *values {
            [south, north, west, east] if values.iter().all(|v| v.is_finite()) => Some(Self {
                south,
                north,
                west,
                east,
            }),
            _ => None,
        }
    }
}
