//! Transaction Handler
//!
//! Serves one client request: answers from the cache when possible,
//! otherwise relays the origin's response while collecting it for caching.

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::cache::ObjectCache;
use crate::error::{ProxyError, Result};
use crate::proxy::error_page;
use crate::proxy::request::{is_header_terminator, RequestLine, UpstreamRequest};
use crate::proxy::uri::{parse_target, OriginTarget};

/// Longest request or header line read in one piece
pub const MAX_LINE: usize = 8192;

/// Bytes moved from origin to client per read
const RELAY_CHUNK: usize = 8192;

// == Outcome ==
/// How a transaction ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Peer closed before sending a request line
    Empty,
    /// Request line or target could not be parsed; nothing was sent
    Malformed,
    /// Method other than GET; a 501 page was sent
    NotImplemented,
    /// Served from the cache
    CacheHit { bytes: usize },
    /// Relayed from the origin
    Fetched { bytes: usize, cached: bool },
}

/// Runs one request/response cycle on `stream`.
///
/// Errors are scoped to this connection: an unreachable origin or a reset
/// client ends the transaction without a response and leaves the cache
/// untouched.
pub async fn handle_transaction<S>(stream: S, cache: &ObjectCache) -> Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut client = BufReader::new(stream);
    let mut line = Vec::new();

    if read_line(&mut client, &mut line).await? == 0 {
        return Ok(Outcome::Empty);
    }

    // The target is the cache key, so it must survive decoding unchanged.
    let Some(request) = std::str::from_utf8(&line).ok().and_then(RequestLine::parse) else {
        debug!("Malformed request line: {:?}", String::from_utf8_lossy(&line));
        return Ok(Outcome::Malformed);
    };

    if !request.is_get() {
        info!(method = %request.method, "Rejecting unsupported method");
        client
            .write_all(&error_page::not_implemented(&request.method))
            .await?;
        client.flush().await?;
        discard_headers(&mut client).await?;
        return Ok(Outcome::NotImplemented);
    }

    // Copy comes back with the lock already released.
    if let Some(cached) = cache.lookup(&request.target).await {
        info!("Cache hit for {}", request.target);
        client.write_all(&cached).await?;
        client.flush().await?;
        discard_headers(&mut client).await?;
        return Ok(Outcome::CacheHit {
            bytes: cached.len(),
        });
    }
    info!("Cache miss for {}", request.target);

    let origin = match parse_target(&request.target) {
        Ok(origin) => origin,
        Err(e) => {
            debug!("{}", e);
            return Ok(Outcome::Malformed);
        }
    };

    let upstream = read_client_headers(&mut client, &origin).await?;
    let max_object_size = cache.max_object_size().await;
    let (bytes, collected) =
        fetch_from_origin(&mut client, &origin, &upstream, max_object_size).await?;

    let cached = match collected {
        Some(payload) => cache.store(request.target, payload).await,
        None => false,
    };

    Ok(Outcome::Fetched { bytes, cached })
}

/// Reads one piece of a line including its terminator, up to [`MAX_LINE`]
/// bytes. A longer line arrives over several calls.
///
/// Returns 0 at end of stream.
async fn read_line<R>(reader: &mut R, line: &mut Vec<u8>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let n = (&mut *reader)
        .take(MAX_LINE as u64)
        .read_until(b'\n', line)
        .await?;
    Ok(n)
}

/// Reads one complete header line, joining the pieces of lines longer
/// than [`MAX_LINE`].
///
/// Returns 0 at end of stream.
async fn read_header_line<R>(reader: &mut R, line: &mut Vec<u8>) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut piece = Vec::new();
    line.clear();
    loop {
        if read_line(reader, &mut piece).await? == 0 {
            break;
        }
        line.extend_from_slice(&piece);
        if piece.ends_with(b"\n") {
            break;
        }
    }
    Ok(line.len())
}

/// Reads the client header block and builds the upstream request from it.
async fn read_client_headers<R>(client: &mut R, origin: &OriginTarget) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut upstream = UpstreamRequest::new(origin);
    let mut line = Vec::new();

    loop {
        if read_header_line(client, &mut line).await? == 0 || is_header_terminator(&line) {
            break;
        }
        upstream.push_client_header(&line);
    }

    Ok(upstream.finish())
}

/// Consumes the rest of the client header block so closing the socket does
/// not discard a response the client has yet to read.
async fn discard_headers<R>(client: &mut R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        if read_header_line(client, &mut line).await? == 0 || is_header_terminator(&line) {
            return Ok(());
        }
    }
}

/// Sends `request` to the origin and streams its response to `client`.
///
/// Returns the number of bytes relayed and, when the whole response fit in
/// `max_object_size`, a copy of it.
async fn fetch_from_origin<W>(
    client: &mut W,
    origin: &OriginTarget,
    request: &[u8],
    max_object_size: usize,
) -> Result<(usize, Option<Vec<u8>>)>
where
    W: AsyncWrite + Unpin,
{
    let addr = origin.authority();
    let mut server = TcpStream::connect(&addr)
        .await
        .map_err(|source| ProxyError::OriginConnect {
            addr: addr.clone(),
            source,
        })?;
    debug!("Connected to origin {}", addr);

    server.write_all(request).await?;

    let mut chunk = vec![0u8; RELAY_CHUNK];
    let mut collected = Some(Vec::new());
    let mut relayed = 0usize;

    loop {
        let n = server.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        client.write_all(&chunk[..n]).await?;
        relayed += n;

        let over_limit = collected
            .as_ref()
            .is_some_and(|buf| buf.len() + n > max_object_size);
        if over_limit {
            debug!("Response from {} exceeds {} bytes, not caching", addr, max_object_size);
            collected = None;
        } else if let Some(buf) = collected.as_mut() {
            buf.extend_from_slice(&chunk[..n]);
        }
    }
    client.flush().await?;

    Ok((relayed, collected))
}
