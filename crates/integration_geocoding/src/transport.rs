//! HTTP transport seam
//!
//! The client talks to the upstream through [`HttpTransport`] so retry and
//! caching behaviour can be exercised without a network. [`ReqwestTransport`]
//! is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use tracing::debug;

use crate::config::GeocodingConfig;
use crate::error::{BoxError, GeocodingError};

/// A GET request against an upstream endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Endpoint path relative to the base URL, e.g. `search`
    pub path: &'static str,
    /// Query parameters in order
    pub query: Vec<(&'static str, String)>,
}

impl UpstreamRequest {
    /// Create a request for an endpoint
    #[must_use]
    pub const fn new(path: &'static str) -> Self {
        Self {
            path,
            query: Vec::new(),
        }
    }

    /// Append a query parameter
    #[must_use]
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// Look up a query parameter value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of an upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

impl UpstreamResponse {
    /// Create a response
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Executes single HTTP attempts against the upstream
///
/// Implementations report every received response, whatever its status, as
/// `Ok`. `Err` is reserved for transport-level failures (DNS, connect,
/// timeout, reset) so the retry layer can classify them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform one GET request
    async fn execute(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, BoxError>;
}

/// [`HttpTransport`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Create a transport from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeocodingError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, BoxError> {
        let url = self.url_for(request.path);
        debug!(%url, "Sending geocoding request");

        let response = self.client.get(&url).query(&request.query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_keeps_order() {
        let request = UpstreamRequest::new("search")
            .param("q", "Temuco")
            .param("format", "json");
        assert_eq!(request.path, "search");
        assert_eq!(
            request.query,
            vec![("q", "Temuco".to_string()), ("format", "json".to_string())]
        );
        assert_eq!(request.get("format"), Some("json"));
        assert_eq!(request.get("limit"), None);
    }

    #[test]
    fn response_success_range() {
        assert!(UpstreamResponse::new(200, "").is_success());
        assert!(UpstreamResponse::new(204, "").is_success());
        assert!(!UpstreamResponse::new(199, "").is_success());
        assert!(!UpstreamResponse::new(404, "").is_success());
        assert!(!UpstreamResponse::new(429, "").is_success());
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let config = GeocodingConfig::for_testing("http://localhost:8080/");
        let transport = ReqwestTransport::new(&config).unwrap();
        assert_eq!(transport.url_for("reverse"), "http://localhost:8080/reverse");
    }
}
