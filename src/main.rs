//! Mini Proxy - A caching HTTP forwarding proxy
//!
//! Usage: `mini_proxy <port>`

use std::env;
use std::process;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_proxy::{Config, ProxyServer};

/// Main entry point for the proxy.
///
/// # Startup Sequence
/// 1. Parse the listen port from the command line
/// 2. Initialize tracing subscriber for logging
/// 3. Load limits from environment variables
/// 4. Bind the listener and build the cache and connection queue
/// 5. Start the worker pool and the acceptor
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let port = match (args.len(), args.get(1).map(|p| p.parse::<u16>())) {
        (2, Some(Ok(port))) => port,
        _ => {
            let program = args.first().map(String::as_str).unwrap_or("mini_proxy");
            eprintln!("usage: {} <port>", program);
            process::exit(1);
        }
    };

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_proxy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Proxy");

    let config = Config::from_env().with_port(port);
    info!(
        "Configuration loaded: max_cache_size={}, max_object_size={}, queue_capacity={}, workers={}, stats_interval={}s",
        config.max_cache_size,
        config.max_object_size,
        config.queue_capacity,
        config.worker_count,
        config.stats_interval
    );

    let addr = config.listen_addr();
    let server = ProxyServer::bind(config)
        .await
        .with_context(|| format!("failed to start proxy on {}", addr))?;
    info!("Proxy listening on {}", server.local_addr()?);

    server.run(shutdown_signal()).await?;

    info!("Proxy shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
