//! Cache Store Module
//!
//! Byte-budgeted object store with insertion-order eviction.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, RecencyList};

// == Cache Store ==
/// Object storage evicting oldest-inserted entries first.
///
/// Lookups never reorder entries. Storing a key that is already present
/// adds a second entry; lookups see the newest one and the older copy ages
/// out through normal eviction.
#[derive(Debug)]
pub struct CacheStore {
    /// Entries in insertion order
    entries: RecencyList<CacheEntry>,
    /// Key to the slot of its newest entry
    index: HashMap<String, usize>,
    /// Sum of all entry sizes
    total_size: usize,
    /// Total byte budget
    max_cache_size: usize,
    /// Largest single entry accepted
    max_object_size: usize,
    /// Store-side statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// # Arguments
    /// * `max_cache_size` - Total bytes across all entries
    /// * `max_object_size` - Largest payload a single entry may hold
    pub fn new(max_cache_size: usize, max_object_size: usize) -> Self {
        Self {
            entries: RecencyList::new(),
            index: HashMap::new(),
            total_size: 0,
            max_cache_size,
            max_object_size,
            stats: CacheStats::new(),
        }
    }

    // == Lookup ==
    /// Returns a copy of the newest payload stored under `key`.
    pub fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        self.index
            .get(key)
            .and_then(|&slot| self.entries.get(slot))
            .map(|entry| entry.payload.clone())
    }

    // == Store ==
    /// Inserts `payload` under `key` at the head of the recency list.
    ///
    /// Payloads larger than `max_object_size` are ignored, as are empty
    /// ones. Oldest entries are evicted until the new one fits.
    ///
    /// Returns whether the payload was stored.
    pub fn store(&mut self, key: String, payload: Vec<u8>) -> bool {
        let size = payload.len();
        if size > self.max_object_size || size > self.max_cache_size {
            self.stats.record_rejected();
            debug!(key = %key, size, "Object exceeds cacheable size, not stored");
            return false;
        }
        if size == 0 {
            return false;
        }

        while self.total_size + size > self.max_cache_size {
            if self.evict_oldest().is_none() {
                break;
            }
        }

        let entry = CacheEntry::new(key, payload);
        let key = entry.key.clone();
        let slot = self.entries.push_front(entry);
        self.index.insert(key, slot);
        self.total_size += size;
        self.stats.record_store();
        true
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently inserted entry.
    pub fn evict_oldest(&mut self) -> Option<CacheEntry> {
        let (slot, entry) = self.entries.pop_back()?;

        // A newer duplicate of this key owns the index slot otherwise.
        if self.index.get(&entry.key) == Some(&slot) {
            self.index.remove(&entry.key);
        }
        self.total_size -= entry.size();
        self.stats.record_eviction();
        debug!(
            key = %entry.key,
            size = entry.size(),
            age_ms = entry.age_ms(),
            "Evicted cache entry"
        );
        Some(entry)
    }

    // == Stats ==
    /// Returns store-side statistics with current residency filled in.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_residency(self.entries.len(), self.total_size);
        stats
    }

    /// Keys from newest to oldest, duplicates included.
    #[cfg(test)]
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes in bytes.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn max_object_size(&self) -> usize {
        self.max_object_size
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn payload(byte: u8, len: usize) -> Vec<u8> {
        vec![byte; len]
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(1000, 100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
    }

    #[test]
    fn test_store_and_lookup() {
        let mut store = CacheStore::new(1000, 100);

        assert!(store.store("http://a/".to_string(), b"hello".to_vec()));
        assert_eq!(store.lookup("http://a/"), Some(b"hello".to_vec()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), 5);
    }

    #[test]
    fn test_lookup_nonexistent() {
        let store = CacheStore::new(1000, 100);
        assert_eq!(store.lookup("http://missing/"), None);
    }

    #[test]
    fn test_keys_are_not_normalized() {
        let mut store = CacheStore::new(1000, 100);

        store.store("http://example.com/".to_string(), b"x".to_vec());

        assert!(store.lookup("http://example.com").is_none());
        assert!(store.lookup("http://EXAMPLE.com/").is_none());
    }

    #[test]
    fn test_oversized_store_is_noop() {
        let mut store = CacheStore::new(1000, 100);
        store.store("a".to_string(), payload(1, 50));

        assert!(!store.store("big".to_string(), payload(2, 101)));

        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), 50);
        assert!(store.lookup("big").is_none());
        assert_eq!(store.stats().rejected, 1);
    }

    #[test]
    fn test_object_exactly_at_limit_is_stored() {
        let mut store = CacheStore::new(1000, 100);
        assert!(store.store("edge".to_string(), payload(1, 100)));
        assert_eq!(store.total_size(), 100);
    }

    #[test]
    fn test_empty_payload_not_stored() {
        let mut store = CacheStore::new(1000, 100);
        assert!(!store.store("empty".to_string(), Vec::new()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_eviction_is_oldest_first() {
        let mut store = CacheStore::new(30, 10);

        store.store("a".to_string(), payload(b'a', 10));
        store.store("b".to_string(), payload(b'b', 10));
        store.store("c".to_string(), payload(b'c', 10));

        // Full: d evicts a
        store.store("d".to_string(), payload(b'd', 10));
        assert!(store.lookup("a").is_none());
        assert_eq!(store.keys(), vec!["d", "c", "b"]);

        // e evicts b
        store.store("e".to_string(), payload(b'e', 10));
        assert!(store.lookup("b").is_none());
        assert_eq!(store.keys(), vec!["e", "d", "c"]);
        assert_eq!(store.stats().evictions, 2);
    }

    #[test]
    fn test_large_insert_evicts_several() {
        let mut store = CacheStore::new(30, 25);

        store.store("a".to_string(), payload(1, 10));
        store.store("b".to_string(), payload(2, 10));
        store.store("c".to_string(), payload(3, 10));

        store.store("big".to_string(), payload(4, 25));

        assert_eq!(store.keys(), vec!["big"]);
        assert_eq!(store.total_size(), 25);
        assert_eq!(store.stats().evictions, 3);
    }

    #[test]
    fn test_lookup_does_not_promote() {
        let mut store = CacheStore::new(30, 10);

        store.store("a".to_string(), payload(1, 10));
        store.store("b".to_string(), payload(2, 10));
        store.store("c".to_string(), payload(3, 10));

        // Reading a does not save it from eviction
        assert!(store.lookup("a").is_some());
        store.store("d".to_string(), payload(4, 10));

        assert!(store.lookup("a").is_none());
        assert!(store.lookup("b").is_some());
    }

    #[test]
    fn test_duplicate_keys_coexist() {
        let mut store = CacheStore::new(1000, 100);

        store.store("k".to_string(), b"first".to_vec());
        store.store("k".to_string(), b"second".to_vec());

        assert_eq!(store.len(), 2);
        assert_eq!(store.total_size(), 11);
        assert_eq!(store.lookup("k"), Some(b"second".to_vec()));
    }

    #[test]
    fn test_evicting_older_duplicate_keeps_newer() {
        let mut store = CacheStore::new(20, 10);

        store.store("k".to_string(), payload(1, 10));
        store.store("k".to_string(), payload(2, 10));

        // Evicts the older k
        store.store("x".to_string(), payload(3, 10));

        assert_eq!(store.keys(), vec!["x", "k"]);
        assert_eq!(store.lookup("k"), Some(payload(2, 10)));
    }

    #[test]
    fn test_evicting_last_copy_removes_key() {
        let mut store = CacheStore::new(10, 10);

        store.store("k".to_string(), payload(1, 10));
        store.store("x".to_string(), payload(2, 10));

        assert!(store.lookup("k").is_none());
        assert_eq!(store.lookup("x"), Some(payload(2, 10)));
    }

    #[test]
    fn test_evict_oldest_on_empty() {
        let mut store = CacheStore::new(10, 10);
        assert!(store.evict_oldest().is_none());
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(20, 10);

        store.store("a".to_string(), payload(1, 10));
        store.store("b".to_string(), payload(1, 10));
        store.store("c".to_string(), payload(1, 10));
        store.store("big".to_string(), payload(1, 11));

        let stats = store.stats();
        assert_eq!(stats.stores, 3);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.resident_bytes, 20);
    }
}
