//! Mini Proxy - A caching HTTP forwarding proxy
//!
//! Relays GET requests to origin servers through a fixed pool of workers fed
//! by a bounded connection queue, caching small responses in a shared,
//! byte-budgeted cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod pool;
pub mod proxy;
pub mod server;
pub mod tasks;

pub use cache::ObjectCache;
pub use config::Config;
pub use error::{ProxyError, Result};
pub use server::ProxyServer;
pub use tasks::spawn_stats_task;
