//! Geocoding integration for the infrastructure reports dashboard
//!
//! Converts addresses typed by citizens into coordinates and map positions
//! back into readable addresses via
//! [Nominatim/OpenStreetMap](https://nominatim.openstreetmap.org).
//!
//! # Architecture
//!
//! [`GeocodingClient`] defines the interface, implemented by
//! [`NominatimGeocodingClient`]. Every upstream request passes through a
//! process-wide [`RateGovernor`] (Nominatim's usage policy allows one request
//! per second), results are kept in a FIFO [`ResultCache`], and transient
//! failures are retried per the [`RetryPolicy`]. The HTTP layer sits behind
//! [`HttpTransport`] so tests can substitute it.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_geocoding::{GeocodeOptions, GeocodingClient, GeocodingConfig, NominatimGeocodingClient};
//!
//! let client = NominatimGeocodingClient::new(&GeocodingConfig::default())?;
//!
//! let options = GeocodeOptions::default().with_city("Temuco").with_country("Chile");
//! let results = client.geocode("Av. Alemania 1450", &options).await?;
//! println!("{}", results[0].formatted());
//! ```

mod cache;
mod client;
mod config;
mod error;
mod models;
mod rate_limit;
mod retry;
mod transport;
mod validation;

pub use cache::{CachedLookup, GeoQuery, ResultCache};
pub use client::{
    GeocodeOptions, GeocodingClient, GeocodingStats, NominatimGeocodingClient, ReverseOptions,
};
pub use config::GeocodingConfig;
pub use error::{BoxError, ErrorCode, GeocodingError};
pub use models::{GeoResult, ReverseResult, decode_reverse, decode_search};
pub use rate_limit::RateGovernor;
pub use retry::{RetryPolicy, RetryReason, Verdict, execute_with_retry};
pub use transport::{HttpTransport, ReqwestTransport, UpstreamRequest, UpstreamResponse};
pub use validation::{calculate_distance, parse_coordinates, validate_address, validate_coordinates};

pub use domain::{format_address, format_short_address};
