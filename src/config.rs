//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};

use crate::error::{ProxyError, Result};

/// Default total cache capacity in bytes
pub const DEFAULT_MAX_CACHE_SIZE: usize = 1_049_000;

/// Default largest response that may be cached, in bytes
pub const DEFAULT_MAX_OBJECT_SIZE: usize = 102_400;

/// Default number of pending connections the queue holds
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Default number of pool workers
pub const DEFAULT_WORKER_COUNT: usize = 6;

/// Proxy configuration parameters.
///
/// Limits can be configured via environment variables; the listen port is
/// supplied on the command line.
#[derive(Debug, Clone)]
pub struct Config {
    /// Total bytes the cache may hold across all entries
    pub max_cache_size: usize,
    /// Largest single response body that is eligible for caching
    pub max_object_size: usize,
    /// Number of accepted connections that may wait for a worker
    pub queue_capacity: usize,
    /// Number of long-lived workers
    pub worker_count: usize,
    /// Seconds between cache statistics reports, 0 disables reporting
    pub stats_interval: u64,
    /// Port the proxy listens on
    pub listen_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_CACHE_SIZE` - Total cache capacity in bytes (default: 1049000)
    /// - `MAX_OBJECT_SIZE` - Largest cacheable object in bytes (default: 102400)
    /// - `QUEUE_CAPACITY` - Pending connection slots (default: 16)
    /// - `WORKER_COUNT` - Pool workers (default: 6)
    /// - `STATS_INTERVAL` - Stats report frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_cache_size: env_or("MAX_CACHE_SIZE", defaults.max_cache_size),
            max_object_size: env_or("MAX_OBJECT_SIZE", defaults.max_object_size),
            queue_capacity: env_or("QUEUE_CAPACITY", defaults.queue_capacity),
            worker_count: env_or("WORKER_COUNT", defaults.worker_count),
            stats_interval: env_or("STATS_INTERVAL", defaults.stats_interval),
            listen_port: defaults.listen_port,
        }
    }

    /// Sets the listen port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Address the acceptor binds to (all interfaces).
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.listen_port))
    }

    /// Checks that the limits can be honored together.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(ProxyError::InvalidConfig(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ProxyError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_object_size > self.max_cache_size {
            return Err(ProxyError::InvalidConfig(format!(
                "max_object_size ({}) exceeds max_cache_size ({})",
                self.max_object_size, self.max_cache_size
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            stats_interval: 60,
            listen_port: 0,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
