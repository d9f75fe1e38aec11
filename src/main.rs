//! Foodlab Store server binary
//!
//! Serves the log extraction jobs, visit counters and cache maintenance
//! endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::{signal, sync::watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodlab_store::{create_router, spawn_sweep_task, AppState, Config, Sweep};

/// Main entry point for the store server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create caches, job registry and visit counter
/// 4. Start background sweep tasks for the caches
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Stop jobs and sweeps on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodlab_store=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Foodlab Store");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        entity_max = config.entity_cache.max_entries,
        query_max = config.query_cache.max_entries,
        result_ttl_secs = config.jobs.result_ttl.as_secs(),
        sweep_interval_secs = config.sweep_interval.as_secs(),
        log_file = %config.log_file_path.display(),
        "Configuration loaded"
    );

    let state = AppState::from_config(&config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweepers: Vec<_> = state
        .caches()
        .into_iter()
        .map(|cache| {
            let target: Arc<dyn Sweep> = cache.clone();
            spawn_sweep_task(target, config.sweep_interval, shutdown_rx.clone())
        })
        .collect();
    info!(count = sweepers.len(), "Cache sweep tasks started");

    let log_jobs = state.log_jobs.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    log_jobs.registry().shutdown();
    let _ = shutdown_tx.send(true);
    for handle in sweepers {
        if let Err(e) = handle.await {
            warn!(error = %e, "Sweep task ended abnormally");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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
