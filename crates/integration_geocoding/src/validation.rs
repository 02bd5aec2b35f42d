//! Input validation and pure geographic helpers

use domain::{GeoLocation, haversine_km};

use crate::error::GeocodingError;

/// Validate a coordinate pair
///
/// # Errors
///
/// `InvalidCoordinates` unless both values are finite with latitude in
/// [-90, 90] and longitude in [-180, 180].
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<GeoLocation, GeocodingError> {
    GeoLocation::new(latitude, longitude).map_err(GeocodingError::from)
}

/// Parse and validate coordinates typed into a form
///
/// # Errors
///
/// `InvalidCoordinates` if either value is not a number or out of range.
pub fn parse_coordinates(latitude: &str, longitude: &str) -> Result<GeoLocation, GeocodingError> {
    let parse = |value: &str, name: &str| {
        value.trim().parse::<f64>().map_err(|_| {
            GeocodingError::InvalidCoordinates(format!("{name} must be a valid number"))
        })
    };
    validate_coordinates(parse(latitude, "Latitude")?, parse(longitude, "Longitude")?)
}

/// Trimmed address text
///
/// # Errors
///
/// `InvalidInput` if the address is empty or blank.
pub fn validate_address(address: &str) -> Result<&str, GeocodingError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(GeocodingError::InvalidInput(
            "Address must not be empty".to_string(),
        ));
    }
    Ok(address)
}

/// Great-circle distance in kilometers between two points (Haversine, R = 6371 km)
#[must_use]
pub fn calculate_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    haversine_km(lat1, lng1, lat2, lng2)
}
