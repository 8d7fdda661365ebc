//! Error types for the proxy
//!
//! Provides unified error handling using thiserror.

use std::io;

use thiserror::Error;

// == Proxy Error Enum ==
/// Unified error type for the proxy.
///
/// Every variant is scoped to a single transaction or to startup; there is
/// no process-wide error state.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Socket read or write failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Could not open a connection to the origin server
    #[error("Failed to connect to origin {addr}: {source}")]
    OriginConnect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Request target is not an absolute `http://` URI
    #[error("Invalid request target: {0}")]
    InvalidUri(String),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The connection queue has been closed for shutdown
    #[error("Connection queue closed")]
    QueueClosed,
}

// == Result Type Alias ==
/// Convenience Result type for the proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
