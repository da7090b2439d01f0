//! Application state shared by every handler: the Gateway client.
//!
//! Quiz sessions are not stored here; each WebSocket connection owns its own.

use tracing::{info, instrument};

use crate::config::GatewayConfig;
use crate::error::ConfigError;
use crate::gateway::QuizGateway;

#[derive(Clone)]
pub struct AppState {
    pub gateway: QuizGateway,
}

impl AppState {
    /// Build state from explicit configuration. Fails on a missing credential.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: GatewayConfig) -> Result<Self, ConfigError> {
        let gateway = QuizGateway::new(cfg)?;
        info!(target: "quizgen_backend", run_url = %gateway.run_url, agent_id = %gateway.agent_id, "Quiz gateway enabled.");
        Ok(Self { gateway })
    }
}
