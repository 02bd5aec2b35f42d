//! In-memory result cache
//!
//! Entries expire after a fixed TTL and are evicted lazily on lookup. The
//! cache is bounded; inserting past capacity evicts the oldest insertion
//! (FIFO, not LRU). Re-inserting a key replaces its value and moves it to
//! the back of the eviction order.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use domain::GeoLocation;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::models::{GeoResult, ReverseResult};

/// Normalized description of a lookup, used to derive cache keys
#[derive(Debug, Clone, PartialEq)]
pub enum GeoQuery {
    /// Address text to coordinates
    Forward {
        /// Full query text including city/country context
        address: String,
        /// Country filter
        country_code: String,
        /// Maximum number of results
        limit: u8,
        /// Response language, if any
        language: Option<String>,
    },
    /// Coordinates to address
    Reverse {
        /// Location to look up
        location: GeoLocation,
        /// Response language, if any
        language: Option<String>,
    },
}

impl GeoQuery {
    /// Deterministic cache key for this query
    ///
    /// Address text is trimmed, whitespace-collapsed and lowercased; country
    /// codes are lowercased.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GeoQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward {
                address,
                country_code,
                limit,
                language,
            } => {
                let address = address
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase();
                write!(
                    f,
                    "geocode:{address:?}|cc={}|limit={limit}|lang={}",
                    country_code.trim().to_lowercase(),
                    language.as_deref().unwrap_or("")
                )
            },
            Self::Reverse { location, language } => write!(
                f,
                "reverse:{},{}|lang={}",
                location.latitude(),
                location.longitude(),
                language.as_deref().unwrap_or("")
            ),
        }
    }
}

/// A cached lookup result
#[derive(Debug, Clone, PartialEq)]
pub enum CachedLookup {
    /// Forward geocoding results, sorted by importance
    Forward(Vec<GeoResult>),
    /// Reverse geocoding result
    Reverse(ReverseResult),
}

#[derive(Debug)]
struct CacheEntry {
    data: CachedLookup,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(entry)
    }
}

/// TTL-bounded, size-bounded FIFO cache of lookup results
#[derive(Debug)]
pub struct ResultCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    capacity: usize,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries for `ttl` each
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Fetch a live entry
    ///
    /// An entry older than the TTL is removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<CachedLookup> {
        let mut state = self.state.lock();
        let stored_at = state.entries.get(key)?.stored_at;
        if stored_at.elapsed() < self.ttl {
            return state.entries.get(key).map(|entry| entry.data.clone());
        }
        state.remove(key);
        None
    }

    /// Store an entry, evicting the oldest insertion when over capacity
    pub fn put(&self, key: String, data: CachedLookup) {
        let mut state = self.state.lock();
        state.remove(&key);
        state.order.push_back(key.clone());
        state.entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: Instant::now(),
            },
        );

        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
    }

    /// Number of stored entries, including expired ones not yet evicted
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(3600);

    fn lookup(place: &str) -> CachedLookup {
        CachedLookup::Forward(vec![GeoResult {
            lat: -38.7397,
            lng: -72.5984,
            display_name: place.to_string(),
            address: domain::AddressParts::default(),
            kind: None,
            importance: 0.5,
            place_id: None,
            bounding_box: None,
        }])
    }

    fn forward(address: &str, country_code: &str) -> GeoQuery {
        GeoQuery::Forward {
            address: address.to_string(),
            country_code: country_code.to_string(),
            limit: 5,
            language: None,
        }
    }

    #[test]
    fn identical_queries_share_a_key() {
        let a = forward("Av. Alemania 1450, Temuco", "cl");
        let b = forward("  av. alemania   1450,  TEMUCO ", "CL");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn context_changes_the_key() {
        let a = forward("Temuco", "cl");
        let b = forward("Temuco", "ar");
        assert_ne!(a.cache_key(), b.cache_key());

        let limited = GeoQuery::Forward {
            address: "Temuco".to_string(),
            country_code: "cl".to_string(),
            limit: 1,
            language: None,
        };
        assert_ne!(a.cache_key(), limited.cache_key());
    }

    #[test]
    fn forward_and_reverse_keys_never_collide() {
        let location = GeoLocation::new(-38.7397, -72.5984).unwrap();
        let reverse = GeoQuery::Reverse {
            location,
            language: None,
        };
        assert!(reverse.cache_key().starts_with("reverse:"));
        assert_eq!(reverse.cache_key(), "reverse:-38.7397,-72.5984|lang=");
        assert!(forward("reverse:-38.7397,-72.5984", "cl").cache_key().starts_with("geocode:"));
    }

    #[tokio::test(start_paused = true)]
    async fn put_then_get() {
        let cache = ResultCache::new(TTL, 100);
        cache.put("a".to_string(), lookup("A"));
        assert_eq!(cache.get("a"), Some(lookup("A")));
        assert_eq!(cache.get("missing"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_live_just_before_ttl() {
        let cache = ResultCache::new(TTL, 100);
        cache.put("a".to_string(), lookup("A"));

        tokio::time::advance(TTL - Duration::from_millis(1)).await;
        assert!(cache.get("a").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl_and_is_evicted() {
        let cache = ResultCache::new(TTL, 100);
        cache.put("a".to_string(), lookup("A"));

        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        assert_eq!(cache.len(), 1);
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fifo_eviction_ignores_access_frequency() {
        let cache = ResultCache::new(TTL, 100);
        for i in 0..100 {
            cache.put(format!("k{i}"), lookup(&i.to_string()));
        }
        // Frequent reads of the oldest key do not protect it
        for _ in 0..10 {
            assert!(cache.get("k0").is_some());
        }

        cache.put("k100".to_string(), lookup("100"));
        assert_eq!(cache.len(), 100);
        assert!(cache.get("k0").is_none());
        assert!(cache.get("k1").is_some());
        assert!(cache.get("k100").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reinsert_replaces_value_and_order() {
        let cache = ResultCache::new(TTL, 2);
        cache.put("a".to_string(), lookup("A1"));
        cache.put("b".to_string(), lookup("B"));
        cache.put("a".to_string(), lookup("A2"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(lookup("A2")));

        // "b" is now the oldest insertion
        cache.put("c".to_string(), lookup("C"));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reinsert_refreshes_ttl() {
        let cache = ResultCache::new(TTL, 10);
        cache.put("a".to_string(), lookup("A"));
        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        cache.put("a".to_string(), lookup("A"));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("a").is_some());
    }
}
