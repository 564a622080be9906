//! Tiered Cache - HTTP server over a set of named two-tier caches

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiered_cache::api::create_router;
use tiered_cache::{AppState, CacheManager, Config, DurableStore, FileStore, MemoryStore};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable store and create the configured caches
/// 4. Start the background expiry sweep
/// 5. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiered_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tiered cache server");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: port={}, cache_dir={:?}, cleanup_interval={}s, caches={}",
        config.server_port,
        config.cache_dir,
        config.cleanup_interval,
        config.caches.len()
    );

    let store: Arc<dyn DurableStore> = match &config.cache_dir {
        Some(dir) => {
            let files = FileStore::open(dir)
                .await
                .with_context(|| format!("cannot open cache directory {}", dir.display()))?;
            info!("Durable tier stored under {}", files.root().display());
            Arc::new(files)
        }
        None => {
            warn!("CACHE_DIR not set, durable tier will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let manager: Arc<CacheManager<Value>> = Arc::new(CacheManager::new(store));
    for (name, options) in &config.caches {
        let cache = manager
            .create_cache(name, options.clone())
            .await
            .with_context(|| format!("cannot create cache '{}'", name))?;
        if let Err(err) = cache.disk().initialize().await {
            warn!(cache = %name, error = %err, "durable index not loaded yet, will retry on first use");
        }
    }

    manager.start_auto_cleanup(Duration::from_secs(config.cleanup_interval.max(1)));

    let app = create_router(AppState::new(manager.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    manager.stop_auto_cleanup();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
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
}
