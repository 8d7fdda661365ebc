//! Client Request Handling
//!
//! Parses the client's request line and rewrites its header block into the
//! HTTP/1.0 request sent upstream.

use crate::proxy::uri::OriginTarget;

/// User-Agent presented to every origin
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";

/// Client headers the proxy replaces with its own values
const OVERRIDDEN_HEADERS: [&str; 3] = ["user-agent", "connection", "proxy-connection"];

// == Request Line ==
/// First line of a client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    /// Request target verbatim; doubles as the cache key
    pub target: String,
    pub version: String,
}

impl RequestLine {
    /// Splits `METHOD TARGET VERSION`.
    ///
    /// Returns `None` when any of the three fields is missing.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let method = fields.next()?;
        let target = fields.next()?;
        let version = fields.next()?;

        Some(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
        })
    }

    /// Only GET is served; the comparison ignores ASCII case.
    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Header name of a raw `Name: value\r\n` line, if it has one.
///
/// Only the bytes before the first colon are inspected; the value may hold
/// any octets.
fn header_name(line: &[u8]) -> Option<&[u8]> {
    let colon = line.iter().position(|&b| b == b':')?;
    Some(line[..colon].trim_ascii())
}

/// Whether a header line is a blank line ending the header block.
pub fn is_header_terminator(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}

// == Upstream Request Builder ==
/// Accumulates the request forwarded to the origin.
///
/// Client header lines are kept byte for byte and in order, except the
/// connection-management headers which are dropped and re-added with fixed
/// values by [`finish`](Self::finish).
#[derive(Debug)]
pub struct UpstreamRequest {
    buf: Vec<u8>,
    host: String,
    has_host: bool,
}

impl UpstreamRequest {
    /// Starts a `GET <path> HTTP/1.0` request for `origin`.
    pub fn new(origin: &OriginTarget) -> Self {
        Self {
            buf: format!("GET {} HTTP/1.0\r\n", origin.path).into_bytes(),
            host: origin.host.clone(),
            has_host: false,
        }
    }

    /// Adds one complete raw client header line (terminator included).
    ///
    /// A line without a terminator, which only happens at end of stream,
    /// gets `\r\n` appended.
    pub fn push_client_header(&mut self, line: &[u8]) {
        if let Some(name) = header_name(line) {
            if OVERRIDDEN_HEADERS
                .iter()
                .any(|h| name.eq_ignore_ascii_case(h.as_bytes()))
            {
                return;
            }
            if name.eq_ignore_ascii_case(b"host") {
                self.has_host = true;
            }
        }

        self.buf.extend_from_slice(line);
        if !line.ends_with(b"\n") {
            self.buf.extend_from_slice(b"\r\n");
        }
    }

    /// Appends the proxy's own headers and the blank line.
    pub fn finish(mut self) -> Vec<u8> {
        if !self.has_host {
            self.buf.extend_from_slice(b"Host: ");
            self.buf.extend_from_slice(self.host.as_bytes());
            self.buf.extend_from_slice(b"\r\n");
        }
        self.buf.extend_from_slice(b"User-Agent: ");
        self.buf.extend_from_slice(USER_AGENT.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
        self.buf.extend_from_slice(b"Connection: close\r\n");
        self.buf.extend_from_slice(b"Proxy-Connection: close\r\n");
        self.buf.extend_from_slice(b"\r\n");
        self.buf
    }
}
