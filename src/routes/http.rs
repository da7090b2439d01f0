//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, State},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::error::generation_failed_response;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// Relay to the Gateway and return its quiz JSON untouched. Input is not validated here;
/// the caller validates before sending. A body that is not a JSON object gets the same
/// generic failure as an upstream error.
#[instrument(level = "info", skip(state, body))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  body: Result<Json<GenerateIn>, JsonRejection>,
) -> Response {
  let body = match body {
    Ok(Json(body)) => body,
    Err(rejection) => {
      warn!(target: "quizgen_backend", error = %rejection, "Unreadable generate request body");
      return generation_failed_response();
    }
  };

  let (topic, num_questions, difficulty) = body.instruction_parts();
  match state.gateway.generate(&topic, &num_questions, &difficulty).await {
    Ok(quiz) => {
      info!(target: "quizgen_backend", "HTTP quiz generated");
      Json(quiz).into_response()
    }
    Err(e) => e.into_response(),
  }
}
