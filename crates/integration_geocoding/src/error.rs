//! Geocoding error types

use std::fmt;

use domain::InvalidCoordinates;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed error used to carry transport and processing causes
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the geocoding client
///
/// Retryable conditions are resolved inside the client before surfacing, so
/// callers only ever see the terminal classification.
#[derive(Debug, Error)]
pub enum GeocodingError {
    /// The address was empty or blank
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Latitude or longitude out of range or not a number
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    /// Upstream kept answering HTTP 429 after every retry
    #[error("Geocoding rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded {
        /// Number of attempts made
        attempts: u32,
    },

    /// Upstream answered HTTP 404
    #[error("Location not found")]
    NotFound,

    /// Upstream answered successfully with an empty result set
    #[error("No results for \"{query}\"")]
    NoResults {
        /// The query text sent upstream
        query: String,
    },

    /// Upstream answered with another non-success status
    #[error("Geocoding server error: HTTP {status}")]
    ServerError {
        /// HTTP status code
        status: u16,
    },

    /// Transport-level failure persisted after every retry
    #[error("Geocoding connection failed after {attempts} attempts: {source}")]
    NetworkError {
        /// Number of attempts made
        attempts: u32,
        /// The last underlying failure
        #[source]
        source: BoxError,
    },

    /// The reverse endpoint returned an error marker
    #[error("Reverse geocoding failed: {0}")]
    ReverseGeocodeFailed(String),

    /// Unexpected failure while decoding or normalizing a response
    #[error("Failed to process geocoding response: {message}")]
    ProcessingError {
        /// What was being done
        message: String,
        /// The underlying failure
        #[source]
        source: BoxError,
    },

    /// The client could not be constructed
    #[error("Geocoding configuration error: {0}")]
    Configuration(String),
}

impl GeocodingError {
    /// Wrap an unexpected failure
    pub fn processing(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ProcessingError {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Stable discriminant for callers that render distinct UI states
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::InvalidCoordinates(_) => ErrorCode::InvalidCoordinates,
            Self::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            Self::NotFound => ErrorCode::NotFound,
            Self::NoResults { .. } => ErrorCode::NoResults,
            Self::ServerError { .. } => ErrorCode::ServerError,
            Self::NetworkError { .. } => ErrorCode::NetworkError,
            Self::ReverseGeocodeFailed(_) => ErrorCode::ReverseGeocodeFailed,
            Self::ProcessingError { .. } => ErrorCode::ProcessingError,
            Self::Configuration(_) => ErrorCode::ConfigurationError,
        }
    }

    /// Returns true if trying again later may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::NetworkError { .. }
        )
    }
}

impl From<InvalidCoordinates> for GeocodingError {
    fn from(err: InvalidCoordinates) -> Self {
        Self::InvalidCoordinates(err.to_string())
    }
}

/// Discriminant of [`GeocodingError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Empty or blank address
    InvalidInput,
    /// Coordinates out of range
    InvalidCoordinates,
    /// Persistent HTTP 429
    RateLimitExceeded,
    /// HTTP 404
    NotFound,
    /// Empty result set
    NoResults,
    /// Other non-success HTTP status
    ServerError,
    /// Persistent transport failure
    NetworkError,
    /// Reverse endpoint error marker
    ReverseGeocodeFailed,
    /// Unexpected decoding failure
    ProcessingError,
    /// Invalid client configuration
    ConfigurationError,
}

impl ErrorCode {
    /// Wire representation, e.g. `RATE_LIMIT_EXCEEDED`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidCoordinates => "INVALID_COORDINATES",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::NoResults => "NO_RESULTS",
            Self::ServerError => "SERVER_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ReverseGeocodeFailed => "REVERSE_GEOCODE_FAILED",
            Self::ProcessingError => "PROCESSING_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
        }
    }

    /// Message suitable for showing to an end user
    #[must_use]
    pub const fn user_hint(self) -> &'static str {
        match self {
            Self::InvalidInput => "Please enter an address.",
            Self::InvalidCoordinates => "The selected position is not a valid location.",
            Self::RateLimitExceeded => "Too many lookups right now. Try again shortly.",
            Self::NotFound | Self::NoResults => "No matches found for this location.",
            Self::ServerError => "The map service is having problems. Try again later.",
            Self::NetworkError => "Could not reach the map service. Check your connection.",
            Self::ReverseGeocodeFailed => "Could not find an address for this position.",
            Self::ProcessingError | Self::ConfigurationError => {
                "Something went wrong while looking up the location."
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
