//! String-keyed TTL cache with an injected clock.

use crate::clock::SharedClock;
use std::collections::HashMap;
use std::sync::RwLock;

struct Entry<T> {
    value: T,
    expires_at: i64,
}

/// An in-process cache whose entries expire after a fixed TTL.
///
/// Expiry is evaluated lazily against the injected clock on every read, so a
/// stale entry is never returned even if nothing has purged it yet. Writers
/// that need to force a re-read (e.g. after mutating the underlying data)
/// call [`TtlCache::invalidate`].
pub struct TtlCache<T> {
    entries: RwLock<HashMap<String, Entry<T>>>,
    clock: SharedClock,
    ttl_secs: i64,
}

impl<T: Clone> TtlCache<T> {
    /// Create a cache whose entries live for `ttl_secs` seconds.
    pub fn new(clock: SharedClock, ttl_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ttl_secs,
        }
    }

    /// Get a live entry, or `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    /// Insert a value with the default TTL.
    pub fn put(&self, key: impl Into<String>, value: T) {
        self.put_with_ttl(key, value, self.ttl_secs);
    }

    /// Insert a value with an explicit TTL in seconds.
    pub fn put_with_ttl(&self, key: impl Into<String>, value: T, ttl_secs: i64) {
        let expires_at = self.clock.now() + ttl_secs;
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(key.into(), Entry { value, expires_at });
    }

    /// Drop an entry, forcing the next read to miss.
    pub fn invalidate(&self, key: &str) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.remove(key);
    }

    /// Remove every expired entry and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of entries currently stored, expired or not.
    pub fn len(&self) -> usize {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.len()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn cache_at(now: i64, ttl: i64) -> (Arc<ManualClock>, TtlCache<String>) {
        let clock = Arc::new(ManualClock::at(now));
        let cache = TtlCache::new(clock.clone(), ttl);
        (clock, cache)
    }

    #[test]
    fn test_hit_before_expiry() {
        let (_, cache) = cache_at(1_000, 60);
        cache.put("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_miss_at_deadline() {
        let (clock, cache) = cache_at(1_000, 60);
        cache.put("k", "v".to_string());

        clock.advance(59);
        assert!(cache.get("k").is_some());

        clock.advance(1);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_invalidate_forces_miss() {
        let (_, cache) = cache_at(1_000, 60);
        cache.put("k", "v".to_string());
        cache.invalidate("k");
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_explicit_ttl_overrides_default() {
        let (clock, cache) = cache_at(1_000, 60);
        cache.put_with_ttl("short", "v".to_string(), 5);

        clock.advance(5);
        assert!(cache.get("short").is_none());
    }

    #[test]
    fn test_purge_drops_only_expired() {
        let (clock, cache) = cache_at(1_000, 60);
        cache.put_with_ttl("a", "1".to_string(), 10);
        cache.put_with_ttl("b", "2".to_string(), 100);

        clock.advance(10);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_overwrite_refreshes_deadline() {
        let (clock, cache) = cache_at(1_000, 60);
        cache.put("k", "old".to_string());

        clock.advance(59);
        cache.put("k", "new".to_string());

        clock.advance(30);
        assert_eq!(cache.get("k"), Some("new".to_string()));
    }
}
