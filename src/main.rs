//! Thesis Guard - token revocation and response caching service
//!
//! Serves the operations API over the cache and revocation store.

use std::future::IntoFuture;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thesis_guard::revocation::SqliteBackend;
use thesis_guard::{create_admin_router, create_router, AppState, Config, GuardService};

/// Main entry point for the guard service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable revocation table
/// 4. Start the service: initial mirror load, sweepers, sync and reaper
/// 5. Create the public and admin routers
/// 6. Serve the public router on every interface, the admin router on loopback
/// 7. Handle graceful shutdown on SIGINT/SIGTERM, then stop background tasks
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thesis_guard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Thesis Guard");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        admin_port = config.admin_port,
        categories = config.categories.len(),
        sync_interval_secs = config.revocation.sync_interval.as_secs(),
        reaper_interval_secs = config.revocation.reaper_interval.as_secs(),
        token_lifetime_secs = config.token_lifetime.as_secs(),
        store = %config.revocation_store_path.display(),
        "Configuration loaded"
    );

    let backend = SqliteBackend::open(config.revocation_store_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open revocation store at {}",
                config.revocation_store_path.display()
            )
        })?;

    let mut service = GuardService::new(&config, Arc::new(backend));
    service.start().await;

    let state = AppState::from_config(&service, &config);
    let app = create_router(state.clone());
    let admin_app = create_admin_router(state);

    // Bind to configured ports
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    let admin_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, config.admin_port));
    let admin_listener = tokio::net::TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("failed to bind {admin_addr}"))?;
    info!("Admin API listening on http://{}", admin_addr);

    // One signal drains both listeners
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let public = axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
        .into_future();
    let admin = axum::serve(admin_listener, admin_app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .into_future();
    let (served, admin_served) = tokio::join!(public, admin);

    service.stop().await;
    served.context("server error")?;
    admin_served.context("admin server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
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
                warn!(error = %err, "Failed to install SIGTERM handler");
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
