//! Bandwise · exam generation and band-scoring backend
//!
//! - Axum HTTP API over the `bandwise` library
//! - Optional generative-text service (via environment variables)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   LLM_PROVIDER      : "openai" (default), "gemini", "cohere" or "plain"
//!   LLM_API_KEY       : enables the text service if present
//!   LLM_BASE_URL      : provider default if unset
//!   LLM_MODEL         : provider default if unset
//!   LLM_TIMEOUT_SECS  : per-request timeout (default 30)
//!   AGENT_CONFIG_PATH : path to TOML config (prompts + scoring policy)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod protocol;
mod routes;
mod state;
mod telemetry;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::new());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "bandwise", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "bandwise", "HTTP server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "bandwise", error = %e, "Failed to listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "bandwise", "Shutdown signal received");
}
