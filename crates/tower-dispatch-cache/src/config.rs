//! Configuration for the response cache.

use crate::events::CacheEvent;
use std::time::Duration;
use tower_dispatch_core::{EventListeners, FnListener};

/// Default TTL for ordinary reads (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// TTL for high-churn reads such as live attendance (1 minute).
pub const SHORT_TTL: Duration = Duration::from_secs(60);

/// Configuration for the response cache.
#[derive(Clone)]
pub struct CacheConfig {
    pub(crate) default_ttl: Duration,
    pub(crate) short_ttl: Duration,
    pub(crate) event_listeners: EventListeners<CacheEvent>,
    pub(crate) name: String,
}

impl CacheConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// TTL applied when a read does not pick one.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// TTL for time-sensitive reads.
    pub fn short_ttl(&self) -> Duration {
        self.short_ttl
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfigBuilder::new().build()
    }
}

/// Builder for [`CacheConfig`].
pub struct CacheConfigBuilder {
    default_ttl: Duration,
    short_ttl: Duration,
    event_listeners: EventListeners<CacheEvent>,
    name: String,
}

impl CacheConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            short_ttl: SHORT_TTL,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the TTL used by reads that do not specify one.
    ///
    /// Default: 5 minutes
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the TTL for high-churn reads.
    ///
    /// Default: 1 minute
    pub fn short_ttl(mut self, ttl: Duration) -> Self {
        self.short_ttl = ttl;
        self
    }

    /// Sets the name of this cache instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked with the key on every cache hit.
    pub fn on_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Hit { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked with the key on every cache miss.
    pub fn on_miss<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Miss { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked when the whole cache is cleared.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the number of entries that were dropped.
    pub fn on_clear<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CacheEvent::Cleared { entries, .. } = event {
                f(*entries);
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CacheConfig {
        CacheConfig {
            default_ttl: self.default_ttl,
            short_ttl: self.short_ttl,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
