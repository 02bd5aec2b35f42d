//! Value Objects - Immutable, identity-less domain primitives

mod address;
mod bounding_box;
mod geo_location;

pub use address::{AddressParts, UNKNOWN_LOCATION, format_address, format_short_address};
pub use bounding_box::BoundingBox;
pub use geo_location::{EARTH_RADIUS_KM, GeoLocation, InvalidCoordinates, haversine_km};
