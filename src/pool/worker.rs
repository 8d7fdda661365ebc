//! Worker Pool
//!
//! Fixed set of long-lived workers that drain the connection queue one
//! transaction at a time.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cache::ObjectCache;
use crate::pool::BoundedQueue;
use crate::proxy::{self, Outcome};

// == Connection Ticket ==
/// An accepted client connection waiting for a worker.
#[derive(Debug)]
pub struct ConnectionTicket {
    /// Acceptor-assigned sequence number
    pub id: u64,
    /// Client socket, closed when the ticket is dropped
    pub stream: TcpStream,
    /// Client address
    pub peer: SocketAddr,
}

impl ConnectionTicket {
    pub fn new(id: u64, stream: TcpStream, peer: SocketAddr) -> Self {
        Self { id, stream, peer }
    }
}

// == Worker Pool ==
/// Handles to the spawned worker tasks.
#[derive(Debug)]
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `count` workers sharing `queue` and `cache`.
    ///
    /// Workers loop until the queue is closed.
    pub fn spawn(
        count: usize,
        queue: Arc<BoundedQueue<ConnectionTicket>>,
        cache: ObjectCache,
    ) -> Self {
        let workers = (0..count)
            .map(|id| {
                let queue = queue.clone();
                let cache = cache.clone();
                tokio::spawn(
                    run_worker(queue, cache).instrument(info_span!("worker", id)),
                )
            })
            .collect();

        Self { workers }
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Waits for every worker to exit after the queue has been closed.
    pub async fn join(self) {
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("Worker terminated abnormally: {}", e);
            }
        }
    }
}

/// Worker main loop: one ticket, one transaction, repeat.
async fn run_worker(queue: Arc<BoundedQueue<ConnectionTicket>>, cache: ObjectCache) {
    debug!("Worker started");
    while let Some(ticket) = queue.remove().await {
        serve_ticket(ticket, &cache).await;
    }
    debug!("Connection queue closed, worker exiting");
}

/// Runs one transaction in its own task so that any failure, including a
/// panic, stays with that connection.
async fn serve_ticket(ticket: ConnectionTicket, cache: &ObjectCache) {
    let ConnectionTicket { id, mut stream, peer } = ticket;
    let cache = cache.clone();

    let transaction = tokio::spawn(
        async move {
            let result = proxy::handle_transaction(&mut stream, &cache).await;
            // Close our side; the peer may already be gone.
            let _ = stream.shutdown().await;
            result
        }
        .instrument(info_span!("transaction", id, %peer)),
    );

    match transaction.await {
        Ok(Ok(outcome)) => log_outcome(id, &outcome),
        Ok(Err(e)) => warn!(connection = id, %peer, "Transaction failed: {}", e),
        Err(e) => error!(connection = id, %peer, "Transaction aborted: {}", e),
    }
}

fn log_outcome(id: u64, outcome: &Outcome) {
    match outcome {
        Outcome::Empty | Outcome::Malformed => {
            debug!(connection = id, "Connection closed: {:?}", outcome)
        }
        _ => info!(connection = id, "Transaction complete: {:?}", outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Opens a loopback connection and returns (client side, ticket for server side).
    async fn connection_pair(
        listener: &TcpListener,
        id: u64,
    ) -> (TcpStream, ConnectionTicket) {
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (client, ConnectionTicket::new(id, server, peer))
    }

    async fn send_and_read(mut client: TcpStream, request: &[u8]) -> Vec<u8> {
        client.write_all(request).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_pool_spawns_requested_workers() {
        let queue = Arc::new(BoundedQueue::new(4));
        let cache = ObjectCache::new(CacheStore::new(1000, 100));

        let pool = WorkerPool::spawn(3, queue.clone(), cache);
        assert_eq!(pool.len(), 3);

        queue.close();
        pool.join().await;
    }

    #[tokio::test]
    async fn test_worker_survives_failed_transactions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let queue = Arc::new(BoundedQueue::new(4));
        let cache = ObjectCache::new(CacheStore::new(1000, 100));
        let pool = WorkerPool::spawn(1, queue.clone(), cache);

        // Origin on a port nothing listens on
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = dead.local_addr().unwrap().port();
        drop(dead);

        let (client, ticket) = connection_pair(&listener, 1).await;
        queue.insert(ticket).await.unwrap();
        let request = format!(
            "GET http://127.0.0.1:{}/ HTTP/1.0\r\n\r\n",
            dead_port
        );
        let response = send_and_read(client, request.as_bytes()).await;
        assert!(response.is_empty());

        // Peer hangs up without sending anything
        let (client, ticket) = connection_pair(&listener, 2).await;
        queue.insert(ticket).await.unwrap();
        drop(client);

        // The single worker still serves the next connection
        let (client, ticket) = connection_pair(&listener, 3).await;
        queue.insert(ticket).await.unwrap();
        let response = send_and_read(client, b"POST http://x/ HTTP/1.0\r\n\r\n").await;
        assert!(response.starts_with(b"HTTP/1.0 501 Not Implemented\r\n"));

        queue.close();
        pool.join().await;
    }

    #[tokio::test]
    async fn test_workers_exit_when_queue_closed() {
        let queue = Arc::new(BoundedQueue::new(2));
        let cache = ObjectCache::new(CacheStore::new(1000, 100));
        let pool = WorkerPool::spawn(4, queue.clone(), cache);

        queue.close();
        tokio::time::timeout(std::time::Duration::from_secs(5), pool.join())
            .await
            .expect("workers did not exit");
    }
}
