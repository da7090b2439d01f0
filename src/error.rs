//! Error types: configuration, user input validation, and Gateway failures.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Json, Response},
};
use serde_json::json;

/// Startup misconfiguration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing environment variable: {0}")]
  Missing(&'static str),

  #[error("Invalid value for {name}: {reason}")]
  Invalid { name: &'static str, reason: String },

  #[error("Failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),
}

/// Bad user input on the start form. No network call is made when one of these occurs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("Please enter a valid topic.")]
  EmptyTopic,

  #[error("Number of questions must be between 1 and 20.")]
  QuestionCountOutOfRange(i64),

  #[error("Please select a valid difficulty level.")]
  UnknownDifficulty(String),
}

/// Failure of one call to the external generation service.
/// The variants are for logs; callers only ever show one generic message.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
  #[error("upstream failure: HTTP {status}: {body}")]
  Upstream { status: reqwest::StatusCode, body: String },

  #[error("transport failure: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("upstream call timed out")]
  Timeout,

  #[error("invalid upstream payload: envelope decode failed: {0}")]
  Envelope(#[source] serde_json::Error),

  #[error("invalid upstream payload: inner payload decode failed: {0}")]
  InnerPayload(#[source] serde_json::Error),
}

impl GatewayError {
  pub fn is_timeout(&self) -> bool {
    matches!(self, GatewayError::Timeout)
  }
}

impl From<reqwest::Error> for GatewayError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      GatewayError::Timeout
    } else {
      GatewayError::Transport(err)
    }
  }
}

impl IntoResponse for GatewayError {
  fn into_response(self) -> Response {
    generation_failed_response()
  }
}

/// The only failure body `/api/generate` ever returns, whatever went wrong.
pub fn generation_failed_response() -> Response {
  let body = Json(json!({ "error": "Error generating quiz" }));
  (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}
