//! Cache Entry Module
//!
//! Defines the structure for individual cached response objects.

use std::time::{SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A cached response, keyed by the raw request target.
///
/// Entries are immutable once stored; they are only read or evicted.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Request target exactly as the client sent it
    pub key: String,
    /// Response bytes as relayed from the origin (status line, headers, body)
    pub payload: Vec<u8>,
    /// Insertion timestamp (Unix milliseconds)
    pub stored_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(key: String, payload: Vec<u8>) -> Self {
        Self {
            key,
            payload,
            stored_at: current_timestamp_ms(),
        }
    }

    // == Size ==
    /// Number of payload bytes this entry charges against the cache budget.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    // == Age ==
    /// Milliseconds since the entry was stored.
    pub fn age_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.stored_at)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
