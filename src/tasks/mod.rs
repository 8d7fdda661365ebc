//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the proxy serves.
//!
//! # Tasks
//! - Stats reporting: logs cache statistics at the configured interval

mod stats;

pub use stats::spawn_stats_task;
