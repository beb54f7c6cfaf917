//! Typed key-value cache with optional TTL per entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::CacheConfig;

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,

    /// When this entry stops being visible. `None` never expires.
    pub expires_at: Option<Instant>,

    /// When this entry was inserted into cache.
    pub cached_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create a new cache entry. A zero TTL means no expiration.
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: ttl.filter(|t| !t.is_zero()).map(|t| now + t),
            cached_at: now,
        }
    }

    /// Whether the entry is expired at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Whether the entry is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// Concurrent cache keyed by string with optional per-entry TTL.
///
/// This cache provides:
/// - Entries without expiration (`set`) and with expiration (`set_with_ttl`)
/// - Lazy eviction: reading an expired entry removes it
/// - Periodic eviction through [`TtlCache::spawn_sweeper`]
/// - Thread-safe access via a single writer-preferring RwLock
///
/// Reads run in parallel with each other; writes, lazy evictions and
/// sweeps take the lock exclusively. Clones share the same storage.
pub struct TtlCache<V> {
    inner: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
    config: CacheConfig,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Create an empty cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store a value that never expires.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.put(key.into(), CacheEntry::new(value, None));
    }

    /// Store a value that expires after `ttl`. A zero TTL behaves like [`set`](Self::set).
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.put(key.into(), CacheEntry::new(value, Some(ttl)));
    }

    fn put(&self, key: String, entry: CacheEntry<V>) {
        let mut entries = self.inner.write();
        trace!(key = %key, expires = entry.expires_at.is_some(), "Cache entry stored");
        entries.insert(key, entry);
    }

    /// Store a value only if no live entry exists for `key`.
    ///
    /// An expired entry counts as absent and is replaced. Returns `true`
    /// if the value was inserted.
    pub fn insert_if_absent(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        let key = key.into();
        let mut entries = self.inner.write();
        if entries.get(&key).is_some_and(|e| !e.is_expired()) {
            return false;
        }
        entries.insert(key, CacheEntry::new(value, ttl));
        true
    }

    /// Get a live value.
    ///
    /// Returns `None` if the key is absent or expired. An expired entry is
    /// removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.inner.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a writer may have replaced the entry
        // between the two acquisitions.
        let mut entries = self.inner.write();
        if entries.get(key).is_some_and(|e| e.is_expired_at(now)) {
            entries.remove(key);
            debug!(key = %key, "Expired cache entry evicted on read");
        }
        None
    }

    /// Check if a live entry exists for `key` (without evicting).
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().get(key).is_some_and(|e| !e.is_expired())
    }

    /// Remove an entry, returning its value if it was present and live.
    pub fn delete(&self, key: &str) -> Option<V> {
        let entry = self.inner.write().remove(key)?;
        (!entry.is_expired()).then_some(entry.value)
    }

    /// Remove an entry only if `predicate` accepts its current value.
    pub fn remove_if<F>(&self, key: &str, predicate: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool,
    {
        let mut entries = self.inner.write();
        if entries.get(key).is_some_and(|e| predicate(&e.value)) {
            entries.remove(key).map(|e| e.value)
        } else {
            None
        }
    }

    /// Reset the expiration of a live entry to `ttl` from now, if `predicate`
    /// accepts its value. Returns `true` if the entry was updated.
    pub fn extend_ttl_if<F>(&self, key: &str, ttl: Duration, predicate: F) -> bool
    where
        F: FnOnce(&V) -> bool,
    {
        let now = Instant::now();
        let mut entries = self.inner.write();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) && predicate(&entry.value) => {
                entry.expires_at = (!ttl.is_zero()).then(|| now + ttl);
                true
            }
            _ => false,
        }
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Snapshot of the keys of all live entries.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.inner
            .read()
            .iter()
            .filter(|(_, e)| !e.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Remove every expired entry. Returns how many were removed.
    ///
    /// Called by the sweeper on each tick, but can also be called manually.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.inner.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        let count = before - entries.len();

        if count > 0 {
            debug!(count = count, remaining = entries.len(), "Cleaned up expired cache entries");
        }

        count
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.inner.read();
        let expired = entries.values().filter(|e| e.is_expired_at(now)).count();
        let with_ttl = entries.values().filter(|e| e.expires_at.is_some()).count();
        CacheStats {
            size: entries.len(),
            with_ttl,
            expired,
        }
    }
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("size", &self.inner.read().len())
            .field("config", &self.config)
            .finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of stored entries.
    pub size: usize,

    /// Entries that carry an expiration.
    pub with_ttl: usize,

    /// Entries already expired but not yet evicted.
    pub expired: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn cache() -> TtlCache<String> {
        TtlCache::new(CacheConfig::new())
    }

    #[test]
    fn test_set_and_get() {
        let cache = cache();
        cache.set("k", "v".to_string());

        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert!(cache.contains("k"));
        assert_eq!(cache.get("missing"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiration_evicts_lazily() {
        let cache = cache();
        cache.set_with_ttl("k", "v".to_string(), Duration::from_millis(50));

        assert_eq!(cache.get("k"), Some("v".to_string()));

        sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let cache = cache();
        cache.set_with_ttl("k", "v".to_string(), Duration::ZERO);

        sleep(Duration::from_secs(3600)).await;

        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.stats().with_ttl, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_replaces_expiring_entry() {
        let cache = cache();
        cache.set_with_ttl("k", "old".to_string(), Duration::from_millis(10));
        cache.set("k", "new".to_string());

        sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.get("k"), Some("new".to_string()));
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = cache();
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        assert_eq!(cache.delete("a"), Some("1".to_string()));
        assert_eq!(cache.delete("a"), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_skips_expired() {
        let cache = cache();
        cache.set("live", "1".to_string());
        cache.set_with_ttl("short", "2".to_string(), Duration::from_millis(10));

        let mut keys = cache.keys();
        keys.sort();
        assert_eq!(keys, vec!["live", "short"]);

        sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.keys(), vec!["live"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_if_absent() {
        let cache = cache();
        assert!(cache.insert_if_absent("k", "first".to_string(), None));
        assert!(!cache.insert_if_absent("k", "second".to_string(), None));
        assert_eq!(cache.get("k"), Some("first".to_string()));

        cache.set_with_ttl("e", "stale".to_string(), Duration::from_millis(10));
        sleep(Duration::from_millis(20)).await;
        assert!(cache.insert_if_absent("e", "fresh".to_string(), None));
        assert_eq!(cache.get("e"), Some("fresh".to_string()));
    }

    #[test]
    fn test_remove_if() {
        let cache = cache();
        cache.set("k", "keep".to_string());

        assert_eq!(cache.remove_if("k", |v| v == "other"), None);
        assert!(cache.contains("k"));

        assert_eq!(cache.remove_if("k", |v| v == "keep"), Some("keep".to_string()));
        assert!(!cache.contains("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_ttl_if() {
        let cache = cache();
        cache.set_with_ttl("k", "v".to_string(), Duration::from_millis(50));

        assert!(!cache.extend_ttl_if("k", Duration::from_secs(1), |v| v == "other"));
        assert!(cache.extend_ttl_if("k", Duration::from_secs(1), |v| v == "v"));
        sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.get("k"), Some("v".to_string()));

        sleep(Duration::from_secs(1)).await;
        assert!(!cache.extend_ttl_if("k", Duration::from_secs(1), |_| true));
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let cache = cache();
        for i in 1..=3 {
            cache.set_with_ttl(format!("k{i}"), i.to_string(), Duration::from_millis(50));
        }
        cache.set("forever", "x".to_string());

        sleep(Duration::from_millis(100)).await;

        assert_eq!(cache.stats().expired, 3);
        assert_eq!(cache.cleanup_expired(), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cleanup_expired(), 0);
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = cache();
        let other = cache.clone();
        other.set("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_and_writers() {
        let cache: TtlCache<usize> = TtlCache::new(CacheConfig::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..200 {
                    let key = format!("k{}", i % 16);
                    if (t + i) % 3 == 0 {
                        cache.set_with_ttl(key, i, Duration::from_millis(1));
                    } else if (t + i) % 3 == 1 {
                        let _ = cache.get(&key);
                    } else {
                        cache.cleanup_expired();
                    }
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(cache.len() <= 16);
    }
}
