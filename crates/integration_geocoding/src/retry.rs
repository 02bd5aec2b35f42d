//! Retry policy for upstream requests
//!
//! A [`RetryPolicy`] classifies each attempt into done, retry, or fail and
//! computes the linear backoff before the next one. [`execute_with_retry`]
//! drives any fallible operation with such a policy, sending every attempt
//! through the shared [`RateGovernor`].
//!
//! | Outcome | Verdict | Backoff |
//! |---|---|---|
//! | 2xx | done | |
//! | 429 | retry, then `RateLimitExceeded` | `rate_limited_backoff_ms * (attempt + 1)` |
//! | 404 | fail with `NotFound` | |
//! | other status | fail with `ServerError` | |
//! | transport failure | retry, then `NetworkError` | `network_backoff_ms * (attempt + 1)` |

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BoxError, GeocodingError};
use crate::rate_limit::RateGovernor;
use crate::transport::UpstreamResponse;

/// Retry configuration for upstream requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit after an HTTP 429, in milliseconds (default: 2000)
    #[serde(default = "default_rate_limited_backoff_ms")]
    pub rate_limited_backoff_ms: u64,

    /// Backoff unit after a transport failure, in milliseconds (default: 1000)
    #[serde(default = "default_network_backoff_ms")]
    pub network_backoff_ms: u64,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_rate_limited_backoff_ms() -> u64 {
    2000
}

const fn default_network_backoff_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            rate_limited_backoff_ms: default_rate_limited_backoff_ms(),
            network_backoff_ms: default_network_backoff_ms(),
        }
    }
}

/// Why an attempt should be retried
#[derive(Debug)]
pub enum RetryReason {
    /// Upstream answered HTTP 429
    RateLimited,
    /// The request never produced a response
    Network(BoxError),
}

/// Classification of a single attempt
#[derive(Debug)]
pub enum Verdict<T> {
    /// Attempt succeeded
    Done(T),
    /// Attempt failed in a way that may succeed later
    Retry(RetryReason),
    /// Attempt failed for good
    Fail(GeocodingError),
}

impl RetryPolicy {
    /// Classify the outcome of one upstream attempt
    #[must_use]
    pub fn classify(outcome: Result<UpstreamResponse, BoxError>) -> Verdict<UpstreamResponse> {
        match outcome {
            Ok(response) if response.is_success() => Verdict::Done(response),
            Ok(response) => match response.status {
                429 => Verdict::Retry(RetryReason::RateLimited),
                404 => Verdict::Fail(GeocodingError::NotFound),
                status => Verdict::Fail(GeocodingError::ServerError { status }),
            },
            Err(err) => Verdict::Retry(RetryReason::Network(err)),
        }
    }

    /// Delay before the attempt following `attempt_index` (0-based)
    #[must_use]
    pub fn backoff(&self, reason: &RetryReason, attempt_index: u32) -> Duration {
        let unit = match reason {
            RetryReason::RateLimited => self.rate_limited_backoff_ms,
            RetryReason::Network(_) => self.network_backoff_ms,
        };
        Duration::from_millis(unit.saturating_mul(u64::from(attempt_index) + 1))
    }

    fn exhausted(reason: RetryReason, attempts: u32) -> GeocodingError {
        match reason {
            RetryReason::RateLimited => GeocodingError::RateLimitExceeded { attempts },
            RetryReason::Network(source) => GeocodingError::NetworkError { attempts, source },
        }
    }
}

/// Run `operation` until `classify` accepts or rejects its outcome
///
/// Each attempt first waits for its turn at `governor`. Retries stop after
/// `policy.max_attempts` attempts; the last retry reason then becomes the
/// terminal error.
pub async fn execute_with_retry<T, O, F, Fut, C>(
    policy: &RetryPolicy,
    governor: &RateGovernor,
    mut operation: F,
    classify: C,
) -> Result<T, GeocodingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = O>,
    C: Fn(O) -> Verdict<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt_index = 0u32;

    loop {
        governor.await_turn().await;

        let reason = match classify(operation().await) {
            Verdict::Done(value) => {
                if attempt_index > 0 {
                    debug!(attempts = attempt_index + 1, "Upstream request succeeded after retries");
                }
                return Ok(value);
            },
            Verdict::Fail(err) => {
                debug!(attempts = attempt_index + 1, error = %err, "Upstream request failed");
                return Err(err);
            },
            Verdict::Retry(reason) => reason,
        };

        let attempts = attempt_index + 1;
        if attempts >= max_attempts {
            warn!(attempts, ?reason, "Upstream request failed after max attempts");
            return Err(RetryPolicy::exhausted(reason, attempts));
        }

        let delay = policy.backoff(&reason, attempt_index);
        warn!(
            attempt = attempts,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            ?reason,
            "Upstream request failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt_index += 1;
    }
}
