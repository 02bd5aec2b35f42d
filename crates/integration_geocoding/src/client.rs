//! Nominatim geocoding client
//!
//! Converts free-form addresses to coordinates and back using the
//! [Nominatim](https://nominatim.openstreetmap.org) API (OpenStreetMap).
//!
//! A lookup first consults the [`ResultCache`]; on a miss the upstream round
//! trip runs on its own task, throttled by the [`RateGovernor`] and retried
//! per the [`RetryPolicy`]. The fresh result is written back to the cache
//! even when the caller has stopped waiting for it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cache::{CachedLookup, GeoQuery, ResultCache};
use crate::config::GeocodingConfig;
use crate::error::GeocodingError;
use crate::models::{GeoResult, ReverseResult, decode_reverse, decode_search};
use crate::rate_limit::RateGovernor;
use crate::retry::{RetryPolicy, execute_with_retry};
use crate::transport::{HttpTransport, ReqwestTransport, UpstreamRequest, UpstreamResponse};
use crate::validation::{validate_address, validate_coordinates};

/// Options for forward geocoding
#[derive(Debug, Clone)]
pub struct GeocodeOptions {
    /// City appended to the query for context (e.g., "Temuco")
    pub city: Option<String>,
    /// Country appended to the query for context (e.g., "Chile")
    pub country: Option<String>,
    /// Country filter; the configured default when unset
    pub country_code: Option<String>,
    /// Maximum number of results; the configured default when unset
    pub limit: Option<u8>,
    /// Response language; the configured default when unset
    pub language: Option<String>,
    /// Read from the cache (results are always written back)
    pub use_cache: bool,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            city: None,
            country: None,
            country_code: None,
            limit: None,
            language: None,
            use_cache: true,
        }
    }
}

impl GeocodeOptions {
    /// Add a city to the query
    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Add a country to the query
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Restrict results to a country
    #[must_use]
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    /// Set maximum number of results
    #[must_use]
    pub const fn with_limit(mut self, limit: u8) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the response language
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Always go to the upstream
    #[must_use]
    pub const fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Query text with city and country context appended
    fn query_text(&self, address: &str) -> String {
        let mut query = address.to_string();
        for context in [&self.city, &self.country].into_iter().flatten() {
            let context = context.trim();
            if !context.is_empty() {
                query.push_str(", ");
                query.push_str(context);
            }
        }
        query
    }
}

/// Options for reverse geocoding
#[derive(Debug, Clone)]
pub struct ReverseOptions {
    /// Response language; the configured default when unset
    pub language: Option<String>,
    /// Read from the cache (results are always written back)
    pub use_cache: bool,
}

impl Default for ReverseOptions {
    fn default() -> Self {
        Self {
            language: None,
            use_cache: true,
        }
    }
}

impl ReverseOptions {
    /// Always go to the upstream
    #[must_use]
    pub const fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// Snapshot of client state
#[derive(Debug, Clone, Serialize)]
pub struct GeocodingStats {
    /// Entries currently held by the cache
    pub cache_entries: usize,
    /// When the last upstream request was admitted
    pub last_request_at: Option<DateTime<Utc>>,
}

/// Trait for geocoding clients
#[async_trait]
pub trait GeocodingClient: Send + Sync {
    /// Convert a free-form address to candidate locations, most important first
    async fn geocode(
        &self,
        address: &str,
        options: &GeocodeOptions,
    ) -> Result<Vec<GeoResult>, GeocodingError>;

    /// Convert coordinates to an address
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        options: &ReverseOptions,
    ) -> Result<ReverseResult, GeocodingError>;
}

struct Shared {
    transport: Arc<dyn HttpTransport>,
    cache: ResultCache,
    governor: RateGovernor,
    config: GeocodingConfig,
}

impl Shared {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, GeocodingError> {
        debug!(path = request.path, "Querying geocoding service");
        execute_with_retry(
            &self.config.retry,
            &self.governor,
            || self.transport.execute(request),
            RetryPolicy::classify,
        )
        .await
    }

    fn language(&self, requested: Option<&String>) -> Option<String> {
        requested
            .or(self.config.accept_language.as_ref())
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
    }
}

/// Nominatim-based geocoding client with rate limiting, caching and retries
///
/// Cloning is cheap; clones share one cache and one rate governor.
#[derive(Clone)]
pub struct NominatimGeocodingClient {
    shared: Arc<Shared>,
}

impl fmt::Debug for NominatimGeocodingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NominatimGeocodingClient")
            .field("base_url", &self.shared.config.base_url)
            .field("cache", &self.shared.cache)
            .field("governor", &self.shared.governor)
            .finish_non_exhaustive()
    }
}

impl NominatimGeocodingClient {
    /// Create a new Nominatim geocoding client
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodingError> {
        config.validate().map_err(GeocodingError::Configuration)?;
        let transport = ReqwestTransport::new(config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over a custom transport
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_transport(
        config: &GeocodingConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, GeocodingError> {
        config.validate().map_err(GeocodingError::Configuration)?;
        Ok(Self {
            shared: Arc::new(Shared {
                transport,
                cache: ResultCache::new(config.cache_ttl(), config.cache_capacity),
                governor: RateGovernor::new(config.rate_limit_interval()),
                config: config.clone(),
            }),
        })
    }

    /// Current cache size and last upstream request time
    #[must_use]
    pub fn stats(&self) -> GeocodingStats {
        GeocodingStats {
            cache_entries: self.shared.cache.len(),
            last_request_at: self.shared.governor.last_request_at(),
        }
    }
}

/// Run `future` on its own task so dropping the caller does not abort it
async fn run_detached<T, F>(future: F) -> Result<T, GeocodingError>
where
    F: Future<Output = Result<T, GeocodingError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(future)
        .await
        .map_err(|e| GeocodingError::processing("geocoding task failed", e))?
}

#[async_trait]
impl GeocodingClient for NominatimGeocodingClient {
    #[instrument(skip(self, options), fields(use_cache = options.use_cache))]
    async fn geocode(
        &self,
        address: &str,
        options: &GeocodeOptions,
    ) -> Result<Vec<GeoResult>, GeocodingError> {
        let address = validate_address(address)?;
        let config = &self.shared.config;

        let query_text = options.query_text(address);
        let country_code = options
            .country_code
            .as_deref()
            .map(str::trim)
            .filter(|cc| !cc.is_empty())
            .unwrap_or(&config.default_country_code)
            .to_lowercase();
        let limit = options
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(config.default_limit);
        let language = self.shared.language(options.language.as_ref());

        let key = GeoQuery::Forward {
            address: query_text.clone(),
            country_code: country_code.clone(),
            limit,
            language: language.clone(),
        }
        .cache_key();

        if options.use_cache {
            if let Some(CachedLookup::Forward(results)) = self.shared.cache.get(&key) {
                debug!(%query_text, "Geocoding cache hit");
                return Ok(results);
            }
        }

        let mut request = UpstreamRequest::new("search")
            .param("q", query_text.as_str())
            .param("format", "json")
            .param("limit", limit.to_string())
            .param("addressdetails", "1")
            .param("countrycodes", country_code);
        if let Some(language) = language {
            request = request.param("accept-language", language);
        }

        let shared = Arc::clone(&self.shared);
        let results = run_detached(async move {
            let response = shared.send(&request).await?;
            let results = decode_search(&response.body, &query_text)?;
            shared
                .cache
                .put(key, CachedLookup::Forward(results.clone()));
            debug!(%query_text, count = results.len(), "Geocoded address");
            Ok(results)
        })
        .await?;

        Ok(results)
    }

    #[instrument(skip(self, options), fields(use_cache = options.use_cache))]
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
        options: &ReverseOptions,
    ) -> Result<ReverseResult, GeocodingError> {
        let location = validate_coordinates(latitude, longitude)?;
        let language = self.shared.language(options.language.as_ref());

        let key = GeoQuery::Reverse {
            location,
            language: language.clone(),
        }
        .cache_key();

        if options.use_cache {
            if let Some(CachedLookup::Reverse(result)) = self.shared.cache.get(&key) {
                debug!(%location, "Reverse geocoding cache hit");
                return Ok(result);
            }
        }

        let mut request = UpstreamRequest::new("reverse")
            .param("lat", location.latitude().to_string())
            .param("lon", location.longitude().to_string())
            .param("format", "json")
            .param("addressdetails", "1");
        if let Some(language) = language {
            request = request.param("accept-language", language);
        }

        let shared = Arc::clone(&self.shared);
        run_detached(async move {
            let response = shared.send(&request).await?;
            let result = decode_reverse(&response.body, location)?;
            shared.cache.put(key, CachedLookup::Reverse(result.clone()));
            debug!(%location, "Reverse geocoded");
            Ok(result)
        })
        .await
    }
}
