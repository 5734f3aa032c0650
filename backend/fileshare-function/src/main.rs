use anyhow::{Context, Result};
use fileshare_function::{build_router, config::Config, AppState};
use shared::observability::{init_logging, LogConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (.env first, then the process environment)
    let config = Config::from_env()?;

    init_logging(LogConfig {
        level: config.logging.level,
        format: config.logging.format,
        service_name: "fileshare-function".to_string(),
        ..Default::default()
    })?;

    info!("Starting FileShare function...");

    config.validate()?;
    info!(
        backend = ?config.storage.backend,
        share = %config.storage.share_name,
        directory = %config.storage.directory,
        "Configuration loaded successfully"
    );

    let state = AppState::from_config(&config.storage)?;
    let app = build_router(state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("FileShare function listening on {} (route {})", addr, config.server.route);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("FileShare function stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
