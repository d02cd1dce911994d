use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use heatload_core::alert::AlertGate;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heatload_api::accumulation::AccumulationService;
use heatload_api::config::ServerConfig;
use heatload_api::state::AppState;
use heatload_api::{background, router, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heatload_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        policy = ?config.policy,
        threshold = config.alert_threshold,
        "Loaded server configuration"
    );

    // --- Storage ---
    let requests = storage::open_store(&config.storage)
        .await
        .context("Failed to open collector store")?;
    let scheduler = storage::open_session(&config.storage, &requests)
        .await
        .context("Failed to open scheduler store session")?;

    // --- Alerting ---
    let notifier = heatload_events::notifier_from_env();
    let gate = Arc::new(AlertGate::new(
        config.alert_threshold,
        Arc::clone(&requests.flag),
        notifier,
    ));

    // --- Background check ---
    let check_cancel = CancellationToken::new();
    let check_service = Arc::new(AccumulationService::new(
        scheduler.store,
        config.policy,
        Arc::clone(&gate),
    ));
    let check_handle = tokio::spawn(background::accumulation_check::run(
        check_service,
        config.check_interval,
        check_cancel.clone(),
    ));

    // --- Application state ---
    let state = AppState {
        store: Arc::clone(&requests.store),
        accumulation: Arc::new(AccumulationService::new(
            requests.store,
            config.policy,
            gate,
        )),
        config: Arc::new(config.clone()),
    };

    let app = router::build_app_router(state, &config).context("Invalid CORS configuration")?;

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Graceful shutdown ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    check_cancel.cancel();
    if tokio::time::timeout(Duration::from_secs(5), check_handle)
        .await
        .is_err()
    {
        tracing::warn!("Accumulation check job did not stop in time");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
