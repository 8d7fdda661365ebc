//! Shared Object Cache
//!
//! Readers-writer locked handle to the process-wide [`CacheStore`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;

#[derive(Debug)]
struct Shared {
    store: RwLock<CacheStore>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cloneable handle to the cache shared by every worker.
///
/// Lookups take the read lock and run in parallel with each other; stores
/// and evictions take the write lock. The lock is released before the
/// caller touches the returned bytes, so it is never held across socket I/O.
#[derive(Debug, Clone)]
pub struct ObjectCache {
    shared: Arc<Shared>,
}

impl ObjectCache {
    /// Wraps a store for shared use.
    pub fn new(store: CacheStore) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: RwLock::new(store),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Creates an empty cache sized from the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(CacheStore::new(config.max_cache_size, config.max_object_size))
    }

    /// Returns a copy of the cached payload for `key`, if any.
    pub async fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        let found = {
            let store = self.shared.store.read().await;
            store.lookup(key)
        };

        let counter = if found.is_some() {
            &self.shared.hits
        } else {
            &self.shared.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Stores `payload` under `key`, evicting as needed.
    ///
    /// Returns whether the payload was stored.
    pub async fn store(&self, key: String, payload: Vec<u8>) -> bool {
        let mut store = self.shared.store.write().await;
        store.store(key, payload)
    }

    /// Largest payload the cache will accept.
    pub async fn max_object_size(&self) -> usize {
        self.shared.store.read().await.max_object_size()
    }

    /// Snapshot of all statistics.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = self.shared.store.read().await.stats();
        stats.hits = self.shared.hits.load(Ordering::Relaxed);
        stats.misses = self.shared.misses.load(Ordering::Relaxed);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn test_cache() -> ObjectCache {
        ObjectCache::new(CacheStore::new(1000, 100))
    }

    #[tokio::test]
    async fn test_lookup_after_store_is_identical() {
        let cache = test_cache();
        let data = (0u8..=99).collect::<Vec<_>>();

        assert!(cache.store("http://a/".to_string(), data.clone()).await);
        assert_eq!(cache.lookup("http://a/").await, Some(data));
    }

    #[tokio::test]
    async fn test_hit_and_miss_counters() {
        let cache = test_cache();
        cache.store("k".to_string(), b"v".to_vec()).await;

        cache.lookup("k").await;
        cache.lookup("k").await;
        cache.lookup("nope").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stores, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[tokio::test]
    async fn test_lookups_proceed_while_read_lock_held() {
        let cache = test_cache();
        cache.store("k".to_string(), b"v".to_vec()).await;

        let _reader = cache.shared.store.read().await;

        let found = timeout(Duration::from_millis(200), cache.lookup("k")).await;
        assert_eq!(found.expect("lookup blocked by a reader"), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_lookup_waits_for_writer() {
        let cache = test_cache();
        cache.store("k".to_string(), b"v".to_vec()).await;

        let writer = cache.shared.store.write().await;
        let blocked = timeout(Duration::from_millis(50), cache.lookup("k")).await;
        assert!(blocked.is_err(), "lookup ran while a store held the lock");

        drop(writer);
        assert_eq!(cache.lookup("k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_store_waits_for_readers() {
        let cache = test_cache();

        let reader = cache.shared.store.read().await;
        let blocked = timeout(
            Duration::from_millis(50),
            cache.store("k".to_string(), b"v".to_vec()),
        )
        .await;
        assert!(blocked.is_err(), "store ran while a lookup held the lock");

        drop(reader);
        assert!(cache.store("k".to_string(), b"v".to_vec()).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stores_respect_capacity() {
        let cache = ObjectCache::new(CacheStore::new(500, 50));
        let mut handles = Vec::new();

        for t in 0..8u8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50usize {
                    let key = format!("http://host/{}/{}", t, i);
                    let data = vec![t; 1 + (i % 50)];
                    cache.store(key.clone(), data.clone()).await;
                    if let Some(found) = cache.lookup(&key).await {
                        // Never a torn entry
                        assert!(found.iter().all(|b| *b == t));
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = cache.stats().await;
        assert!(stats.resident_bytes <= 500);
        assert_eq!(stats.stores, 8 * 50);
    }
}
