//! Process-scoped memo cache.
//!
//! Services receive a [`Cache`] rather than reaching for a global, so tests
//! can swap in [`NullCache`]. Entries expire after their own TTL; nothing
//! survives a restart.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Key/value memo with per-entry time-to-live.
pub trait Cache<V>: Send + Sync {
    /// Fresh value for `key`, if any.
    fn get(&self, key: &str) -> Option<V>;

    /// Store `value` under `key` for `ttl`.
    fn set(&self, key: &str, value: V, ttl: Duration);

    /// A fresh value together with its age.
    fn get_with_age(&self, key: &str) -> Option<(V, Duration)> {
        self.get(key).map(|v| (v, Duration::ZERO))
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// In-memory cache backed by a concurrent map.
#[derive(Debug)]
pub struct MemoryCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V: Clone> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&self, key: &str) -> Option<(V, Duration)> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                return Some((entry.value.clone(), entry.stored_at.elapsed()))
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            trace!(key, "Evicting expired cache entry");
            self.entries.remove(key);
        }
        None
    }
}

impl<V: Clone + Send + Sync> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        self.fresh(key).map(|(value, _)| value)
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    fn get_with_age(&self, key: &str) -> Option<(V, Duration)> {
        self.fresh(key)
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl<V> Cache<V> for NullCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn set(&self, _key: &str, _value: V, _ttl: Duration) {}
}
