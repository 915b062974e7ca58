//! TTL-expiring response cache for the tower-dispatch scheduler.
//!
//! The cache stores successful results of idempotent reads under a caller
//! supplied key. Each entry carries its own TTL; an entry is fresh while
//! `now - stored_at < ttl` and a stale entry reads as a miss.
//!
//! # Features
//!
//! - **Per-entry TTL**: reads pick a TTL (default 5 minutes, 1 minute for
//!   high-churn data)
//! - **Lazy expiry**: no background sweeper, stale entries are dropped on read
//!   or by [`ResponseCache::purge_expired`]
//! - **Coarse invalidation**: [`ResponseCache::clear`] wipes every entry, which
//!   is what mutations use
//! - **Event System**: observability through cache events (Hit, Miss, Stored,
//!   Invalidated, Cleared)
//!
//! # Examples
//!
//! ```
//! use tower_dispatch_cache::{CacheConfig, ResponseCache};
//! use std::time::Duration;
//!
//! let cache: ResponseCache<String> = ResponseCache::new(
//!     CacheConfig::builder()
//!         .name("reads")
//!         .on_hit(|key| println!("cache hit for {key}"))
//!         .build(),
//! );
//!
//! cache.put("students:list", "[...]".to_string(), Duration::from_secs(300));
//! assert_eq!(cache.get("students:list").as_deref(), Some("[...]"));
//!
//! cache.clear();
//! assert!(cache.get("students:list").is_none());
//! ```

mod config;
mod events;
mod store;

pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_TTL, SHORT_TTL};
pub use events::CacheEvent;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use store::CacheStore;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};

#[cfg(feature = "tracing")]
use tracing::debug;

/// A shared, TTL-expiring cache of prior results.
///
/// Cloning is cheap; clones share the same entries.
pub struct ResponseCache<V> {
    config: Arc<CacheConfig>,
    store: Arc<Mutex<CacheStore<V>>>,
}

impl<V> Clone for ResponseCache<V> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

impl<V: Clone> ResponseCache<V> {
    /// Creates an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "cache_requests_total",
                "Total number of cache lookups (hits and misses)"
            );
            describe_counter!("cache_clears_total", "Total number of full cache clears");
            describe_gauge!("cache_size", "Current number of entries in the cache");
        }

        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(CacheStore::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore<V>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached value for `key` if a fresh entry exists.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_as(key, Some)
    }

    /// Looks up `key` and converts the stored value.
    ///
    /// A fresh entry that `convert` rejects counts as a miss, in events and
    /// metrics alike.
    pub fn get_as<R>(&self, key: &str, convert: impl FnOnce(V) -> Option<R>) -> Option<R> {
        let cached = self
            .lock()
            .get(key, tokio::time::Instant::now())
            .and_then(convert);
        let name = &self.config.name;

        match cached {
            Some(value) => {
                #[cfg(feature = "metrics")]
                counter!("cache_requests_total", "cache" => name.clone(), "result" => "hit")
                    .increment(1);

                #[cfg(feature = "tracing")]
                debug!(cache = %name, key, "Cache hit");

                self.config.event_listeners.emit(&CacheEvent::Hit {
                    component_name: name.clone(),
                    timestamp: Instant::now(),
                    key: key.to_string(),
                });
                Some(value)
            }
            None => {
                #[cfg(feature = "metrics")]
                counter!("cache_requests_total", "cache" => name.clone(), "result" => "miss")
                    .increment(1);

                #[cfg(feature = "tracing")]
                debug!(cache = %name, key, "Cache miss");

                self.config.event_listeners.emit(&CacheEvent::Miss {
                    component_name: name.clone(),
                    timestamp: Instant::now(),
                    key: key.to_string(),
                });
                None
            }
        }
    }

    /// Stores `value` under `key` for `ttl`, overwriting any existing entry.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.store_if(key.into(), value, ttl, None);
    }

    /// Stores `value` only if the cache has not been cleared since
    /// [`generation`](Self::generation) returned `generation`.
    ///
    /// A result computed before a clear may predate the change that caused
    /// it, so it is dropped instead of being stored. Returns `true` if the
    /// value was stored.
    pub fn put_if_generation(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
        generation: u64,
    ) -> bool {
        self.store_if(key.into(), value, ttl, Some(generation))
    }

    /// Current clear count. Every [`clear`](Self::clear) advances it.
    pub fn generation(&self) -> u64 {
        self.lock().generation()
    }

    fn store_if(&self, key: String, value: V, ttl: Duration, generation: Option<u64>) -> bool {
        {
            let mut store = self.lock();
            if generation.is_some_and(|expected| expected != store.generation()) {
                #[cfg(feature = "tracing")]
                debug!(cache = %self.config.name, key = %key, "Dropping result computed before a clear");
                return false;
            }
            store.insert(key.clone(), value, ttl, tokio::time::Instant::now());

            #[cfg(feature = "metrics")]
            gauge!("cache_size", "cache" => self.config.name.clone()).set(store.len() as f64);
        }

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, key = %key, ttl = ?ttl, "Cache store");

        self.config.event_listeners.emit(&CacheEvent::Stored {
            component_name: self.config.name.clone(),
            timestamp: Instant::now(),
            key,
            ttl,
        });
        true
    }

    /// Stores `value` under `key` with the configured default TTL.
    pub fn put_default(&self, key: impl Into<String>, value: V) {
        self.put(key, value, self.config.default_ttl);
    }

    /// Removes a single key. Returns `true` if an entry existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.lock().remove(key);
        if removed {
            self.config.event_listeners.emit(&CacheEvent::Invalidated {
                component_name: self.config.name.clone(),
                timestamp: Instant::now(),
                key: key.to_string(),
            });
        }
        removed
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let entries = self.lock().clear();

        #[cfg(feature = "metrics")]
        {
            counter!("cache_clears_total", "cache" => self.config.name.clone()).increment(1);
            gauge!("cache_size", "cache" => self.config.name.clone()).set(0.0);
        }

        #[cfg(feature = "tracing")]
        debug!(cache = %self.config.name, entries, "Cache cleared");

        self.config.event_listeners.emit(&CacheEvent::Cleared {
            component_name: self.config.name.clone(),
            timestamp: Instant::now(),
            entries,
        });
    }

    /// Drops every stale entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.lock().purge_expired(tokio::time::Instant::now())
    }

    /// Returns the number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// TTL used by [`put_default`](Self::put_default).
    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// TTL for time-sensitive reads.
    pub fn short_ttl(&self) -> Duration {
        self.config.short_ttl
    }

    /// Name of this cache instance.
    pub fn name(&self) -> &str {
        &self.config.name
    }
}
