//! Quizgen · AI Quiz Generator Backend
//!
//! - Axum HTTP + WebSocket API
//! - Quiz generation through an external agent service (credential via environment)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                          : u16 (default 3000)
//!   TRUFFLE_API_KEY               : generation service credential (required)
//!   TRUFFLE_AGENT_ID              : generation agent id (required)
//!   TRUFFLE_RUN_URL               : default "https://trytruffle.ai/api/v0/run"
//!   QUIZ_GENERATION_TIMEOUT_SECS  : default 60
//!   QUIZ_CONFIG_PATH              : path to TOML config (prompt template)
//!   LOG_LEVEL                     : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT                    : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod config;
mod scoring;
mod session;
mod state;
mod protocol;
mod logic;
mod gateway;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::GatewayConfig;
use crate::error::ConfigError;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing();

  // Missing credentials or unparseable settings stop the process here, before anything is bound.
  let (state, port) = match load() {
    Ok(loaded) => loaded,
    Err(e) => {
      error!(target: "quizgen_backend", error = %e, "Invalid configuration; refusing to start");
      return Err(e.into());
    }
  };

  let app = build_router(Arc::new(state));
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizgen_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

fn load() -> Result<(AppState, u16), ConfigError> {
  let state = AppState::new(GatewayConfig::from_env()?)?;
  Ok((state, config::listen_port()?))
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "quizgen_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "quizgen_backend", "Shutdown signal received");
}
