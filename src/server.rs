//! Proxy Server
//!
//! Owns the listening socket, the shared cache and the connection queue,
//! and runs the acceptor loop that feeds the worker pool.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::cache::ObjectCache;
use crate::config::Config;
use crate::error::Result;
use crate::pool::{BoundedQueue, ConnectionTicket, WorkerPool};
use crate::tasks::spawn_stats_task;

/// Pause after an accept error that is not tied to a single connection
const ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Service object constructed once at startup.
///
/// Every worker receives clones of the same cache handle and queue.
pub struct ProxyServer {
    listener: TcpListener,
    cache: ObjectCache,
    queue: Arc<BoundedQueue<ConnectionTicket>>,
    config: Config,
}

impl ProxyServer {
    /// Validates `config` and binds its listen address.
    pub async fn bind(config: Config) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr()).await?;
        Self::with_listener(listener, config)
    }

    /// Builds a server around an already bound listener.
    pub fn with_listener(listener: TcpListener, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            listener,
            cache: ObjectCache::from_config(&config),
            queue: Arc::new(BoundedQueue::new(config.queue_capacity)),
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the shared cache.
    pub fn cache(&self) -> ObjectCache {
        self.cache.clone()
    }

    /// Serves until `shutdown` resolves.
    ///
    /// On shutdown the acceptor stops, the queue is closed and workers
    /// finish their current transaction before exiting.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let pool = WorkerPool::spawn(
            self.config.worker_count,
            self.queue.clone(),
            self.cache.clone(),
        );
        info!(
            "Worker pool started: workers={}, queue_capacity={}",
            pool.len(),
            self.queue.capacity()
        );

        let stats_task = (self.config.stats_interval > 0)
            .then(|| spawn_stats_task(self.cache.clone(), self.config.stats_interval));

        tokio::select! {
            _ = accept_loop(&self.listener, &self.queue) => {}
            _ = shutdown => {
                info!("Shutdown requested, closing connection queue");
            }
        }

        self.queue.close();
        if let Some(handle) = stats_task {
            handle.abort();
        }
        pool.join().await;
        info!("All workers stopped");
        Ok(())
    }
}

/// Acceptor: the queue's only producer.
///
/// Returns only if the queue is closed.
async fn accept_loop(listener: &TcpListener, queue: &BoundedQueue<ConnectionTicket>) {
    let mut next_id: u64 = 0;

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) if is_connection_error(&e) => {
                debug!("Connection failed during accept: {}", e);
                continue;
            }
            Err(e) => {
                // Resource exhaustion such as EMFILE; retrying at once would spin.
                warn!("Failed to accept connection: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        next_id += 1;
        info!(connection = next_id, "Accepted connection from {}", peer);

        if queue.len() >= queue.capacity() {
            debug!("Connection queue full, acceptor waiting for a free slot");
        }
        if let Err(e) = queue
            .insert(ConnectionTicket::new(next_id, stream, peer))
            .await
        {
            error!("Dropping connection {}: {}", next_id, e);
            return;
        }
    }
}

/// Accept errors caused by one peer; the listener itself is fine.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
