//! Request Target Parsing
//!
//! Splits an absolute `http://` request target into host, port and path.

use crate::error::{ProxyError, Result};

const HTTP_SCHEME: &str = "http://";

/// Port used when the target does not name one
pub const DEFAULT_PORT: &str = "80";

/// Origin location extracted from a request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginTarget {
    pub host: String,
    /// Kept as text; resolution happens at connect time
    pub port: String,
    pub path: String,
}

impl OriginTarget {
    /// `host:port` suitable for connecting.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses `http://host[:port][/path]`.
///
/// Port defaults to `80` and path to `/`. Targets without the `http://`
/// prefix or with an empty host are rejected.
pub fn parse_target(target: &str) -> Result<OriginTarget> {
    let rest = target
        .strip_prefix(HTTP_SCHEME)
        .ok_or_else(|| ProxyError::InvalidUri(target.to_string()))?;

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, port),
        None => (authority, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err(ProxyError::InvalidUri(target.to_string()));
    }

    Ok(OriginTarget {
        host: host.to_string(),
        port: port.to_string(),
        path: path.to_string(),
    })
}
