//! Event types for the response cache.

use std::time::{Duration, Instant};
use tower_dispatch_core::DispatchEvent;

/// Events emitted by the response cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A fresh entry was found for the key.
    Hit {
        /// The name of the cache instance.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The key that was looked up.
        key: String,
    },
    /// No fresh entry existed for the key.
    Miss {
        /// The name of the cache instance.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The key that was looked up.
        key: String,
    },
    /// A value was written.
    Stored {
        /// The name of the cache instance.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The key that was written.
        key: String,
        /// How long the value stays fresh.
        ttl: Duration,
    },
    /// A single key was invalidated.
    Invalidated {
        /// The name of the cache instance.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// The key that was removed.
        key: String,
    },
    /// Every entry was removed.
    Cleared {
        /// The name of the cache instance.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Number of entries dropped.
        entries: usize,
    },
}

impl DispatchEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Hit { .. } => "cache_hit",
            CacheEvent::Miss { .. } => "cache_miss",
            CacheEvent::Stored { .. } => "cache_stored",
            CacheEvent::Invalidated { .. } => "cache_invalidated",
            CacheEvent::Cleared { .. } => "cache_cleared",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Hit { timestamp, .. }
            | CacheEvent::Miss { timestamp, .. }
            | CacheEvent::Stored { timestamp, .. }
            | CacheEvent::Invalidated { timestamp, .. }
            | CacheEvent::Cleared { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            CacheEvent::Hit { component_name, .. }
            | CacheEvent::Miss { component_name, .. }
            | CacheEvent::Stored { component_name, .. }
            | CacheEvent::Invalidated { component_name, .. }
            | CacheEvent::Cleared { component_name, .. } => component_name,
        }
    }
}
