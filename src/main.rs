//! Lease Cache - A persistent key/value cache with expiring stores and entries
//!
//! Serves the cache over HTTP, backed by JSON store files on disk.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lease_cache::api::create_router;
use lease_cache::{spawn_initialize_task, AppState, Config};

/// Delay between failed attempts to open the cache store
const INIT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Main entry point for the Lease Cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache manager over the on-disk engine
/// 4. Start background store initialization
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lease_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Lease Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: store={}, store_lease={}ms, cache_dir={}, port={}",
        config.cache.store_name,
        config.cache.lease_ms(),
        config.cache_dir.display(),
        config.server_port
    );

    let state = AppState::from_config(&config);

    // Open the store in the background; routes answer 503 until it is ready
    let init_handle = spawn_initialize_task(state.cache.clone(), INIT_RETRY_INTERVAL);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(init_handle))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the initialization task if it is still running.
async fn shutdown_signal(init_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
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

    if !init_handle.is_finished() {
        init_handle.abort();
        warn!("Cache initialization aborted");
    }
}
