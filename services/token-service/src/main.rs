//! Session Token Service
//!
//! Single-binary Rust service that:
//! 1. Loads token profiles (access + refresh secrets) at startup
//! 2. Listens for auth requests (login, refresh, logout, register)
//! 3. Rotates refresh tokens on use, keeping one valid fingerprint
//!    per principal
//! 4. Exposes health and Prometheus metrics endpoints

mod config;
mod handlers;
mod issuer;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use principal_store::{Argon2Hasher, MemoryStore};
use session_tokens::codec::{Profile, TokenKind};

use crate::config::Config;
use crate::handlers::{AppState, build_router};
use crate::issuer::Issuer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting session-token-service");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    // Missing secrets are fatal here, never per request
    let access_secret = config
        .tokens
        .access_secret
        .as_ref()
        .context("access secret missing — set ACCESS_TOKEN_SECRET or access_secret_file")?;
    let refresh_secret = config
        .tokens
        .refresh_secret
        .as_ref()
        .context("refresh secret missing — set REFRESH_TOKEN_SECRET or refresh_secret_file")?;

    let access_profile = Profile::new(
        TokenKind::Access,
        access_secret,
        config.tokens.access_lifetime(),
    )
    .context("building access token profile")?;
    let refresh_profile = Profile::new(
        TokenKind::Refresh,
        refresh_secret,
        config.tokens.refresh_lifetime(),
    )
    .context("building refresh token profile")?;

    info!(
        listen_addr = %config.server.listen_addr,
        access_lifetime_secs = config.tokens.access_lifetime_secs,
        refresh_lifetime_secs = config.tokens.refresh_lifetime_secs,
        "configuration loaded"
    );

    let issuer = Arc::new(Issuer::new(
        Arc::new(MemoryStore::new()),
        Arc::new(Argon2Hasher),
        access_profile,
        refresh_profile,
    ));

    let app = build_router(
        AppState { issuer, prometheus },
        config.server.max_connections,
    );

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
