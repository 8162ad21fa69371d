//! Prabodha · HTML/CSS Trainer Backend
//!
//! - Axum HTTP + WebSocket API
//! - Built-in challenge catalog, optional extras from TOML
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT            : u16 (default 3000)
//!   APP_CONFIG_PATH : path to TOML config (editor timing, storage, extra challenges)
//!   PROGRESS_DIR    : directory for per-user progress JSON (in-memory if unset)
//!   LOG_LEVEL       : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use prabodha::routes::build_router;
use prabodha::state::AppState;
use prabodha::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (catalog, sessions, progress store).
  let state = Arc::new(AppState::new());

  // HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "prabodha", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "prabodha", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "prabodha", "Shutdown signal received");
}
