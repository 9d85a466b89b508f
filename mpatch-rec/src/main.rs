//! mpatch-rec - Mood Recommendation Microservice
//!
//! **Module Identity:**
//! - Name: mpatch-rec (Recommender)
//! - Default port: 3000
//!
//! Turns a free-text mood description into an emotion label and a
//! multi-language list of playable songs, and proxies secondary audio
//! sources for the browser player.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mpatch_common::config::{CliOverrides, ServiceConfig};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mpatch_rec::AppState;

/// Command-line arguments for mpatch-rec
#[derive(Parser, Debug)]
#[command(name = "mpatch-rec")]
#[command(about = "Mood-based song recommendation microservice")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "MPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting mpatch-rec v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let cli = CliOverrides {
        config_path: args.config,
        bind_address: args.bind,
        port: args.port,
    };

    let config = ServiceConfig::resolve(&cli).context("Failed to resolve configuration")?;
    info!(config = ?config, "Configuration resolved");

    let state = AppState::from_config(&config).context("Failed to build service state")?;

    if let Some(tokens) = &state.token_cache {
        tokens.clone().spawn_refresh_task();
        info!("Catalog token refresh task started");
    }

    let app = mpatch_rec::build_router(state);

    let addr = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
