//! Overlay editor development backend.
//!
//! Configuration:
//! - `OVERLAY_SERVER_ADDR`: listen address (default `0.0.0.0:8000`)
//! - `OVERLAY_SERVER_TOKENS`: comma-separated accepted bearer tokens
//! - `RUST_LOG`: tracing filter

use std::sync::Arc;

use overlay_server::{AppState, ServerConfig, router};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "overlay_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    if config.tokens.is_none() {
        warn!("OVERLAY_SERVER_TOKENS is not set, accepting any bearer token");
    }

    let state = Arc::new(AppState::new(config.tokens));
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Overlay backend listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
