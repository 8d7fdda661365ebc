//! Proxy Module
//!
//! Per-connection HTTP relay and its collaborators.
//!
//! # Flow
//! - Read the request line; only GET is served
//! - Answer from the cache when the raw target is cached
//! - Otherwise forward an HTTP/1.0 request to the origin and stream the
//!   response back, caching it if it fits

pub mod error_page;
pub mod request;
mod transaction;
pub mod uri;

pub use transaction::{handle_transaction, Outcome, MAX_LINE};
