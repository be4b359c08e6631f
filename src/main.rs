use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use videotube_api::config::AppConfig;
use videotube_api::database::DatabaseManager;
use videotube_api::services::build_media_store;
use videotube_api::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "videotube-api", version, about = "VideoTube REST API server")]
struct Args {
    /// Port to listen on (overrides PORT from the environment)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Do not create the collection indexes at startup
    #[arg(long)]
    skip_indexes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so MONGODB_URI and the token secrets are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting VideoTube API in {:?} mode", config.environment);

    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to configure the database client")?;
    if args.skip_indexes {
        tracing::warn!("Skipping index creation");
    } else {
        db.ensure_indexes().await.context("failed to create indexes")?;
    }

    let media = build_media_store(&config.media);
    tokio::fs::create_dir_all(&config.media.temp_dir)
        .await
        .with_context(|| format!("failed to create {}", config.media.temp_dir))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let app = build_router(AppState::new(config, db, media));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

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
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
