//! Cache storage implementation.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Entry in the cache with its own TTL.
#[derive(Clone, Debug)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Keyed storage of prior results with per-entry TTL.
///
/// Expiry is lazy: a stale entry is dropped when it is next read or by
/// [`purge_expired`](CacheStore::purge_expired), never by a background task.
#[derive(Debug)]
pub(crate) struct CacheStore<V> {
    entries: HashMap<String, CacheEntry<V>>,
    generation: u64,
}

impl<V: Clone> CacheStore<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            generation: 0,
        }
    }

    /// Number of clears so far.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the value for `key` if an entry exists and is still fresh.
    pub(crate) fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        let fresh = self.entries.get(key).map(|entry| entry.is_fresh(now))?;
        if fresh {
            self.entries.get(key).map(|entry| entry.value.clone())
        } else {
            self.entries.remove(key);
            None
        }
    }

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// A zero TTL can never be fresh, so nothing is stored and any previous
    /// entry is removed.
    pub(crate) fn insert(&mut self, key: String, value: V, ttl: Duration, now: Instant) {
        if ttl.is_zero() {
            self.entries.remove(&key);
            return;
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
                ttl,
            },
        );
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes every entry and returns how many were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
        count
    }

    /// Drops stale entries and returns how many were removed.
    pub(crate) fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
