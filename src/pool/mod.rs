//! Pool Module
//!
//! Bounded connection queue and the worker pool that drains it.

mod queue;
mod worker;

pub use queue::BoundedQueue;
pub use worker::{ConnectionTicket, WorkerPool};
