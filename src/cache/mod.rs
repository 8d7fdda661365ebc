//! Cache Module
//!
//! Provides the shared response cache with byte-budgeted, insertion-order
//! eviction.

mod entry;
mod recency;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use recency::RecencyList;
pub use shared::ObjectCache;
pub use stats::CacheStats;
pub use store::CacheStore;
