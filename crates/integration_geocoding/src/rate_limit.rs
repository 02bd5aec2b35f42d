//! Global request spacing for the upstream service
//!
//! Nominatim's usage policy allows at most one request per second from an
//! application. Every outbound attempt, retries included, passes through a
//! single [`RateGovernor`] shared by all callers of a client.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Serializes outbound requests to at most one per interval
#[derive(Debug)]
pub struct RateGovernor {
    interval: Duration,
    // Held across the wait so concurrent callers cannot read a stale timestamp
    last_request: Mutex<Option<Instant>>,
    last_request_at: parking_lot::Mutex<Option<DateTime<Utc>>>,
}

impl RateGovernor {
    /// Create a governor admitting one request per `interval`
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
            last_request_at: parking_lot::Mutex::new(None),
        }
    }

    /// Minimum spacing between admitted requests
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until at least one interval has passed since the previous admission
    ///
    /// Waiters are admitted in call order.
    pub async fn await_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let wait = self.interval.saturating_sub(elapsed);
                debug!(?wait, "Rate limiting geocoding request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
        *self.last_request_at.lock() = Some(Utc::now());
    }

    /// Wall-clock time of the most recent admission
    #[must_use]
    pub fn last_request_at(&self) -> Option<DateTime<Utc>> {
        *self.last_request_at.lock()
    }
}
