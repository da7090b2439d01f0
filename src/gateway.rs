//! Client for the external quiz-generation agent.
//!
//! One POST per quiz: `{agent_id, input_data, json_mode: true}` with the credential in `x-api-key`.
//! The reply is an envelope whose `data` field is itself a JSON-encoded quiz, so decoding
//! happens in two stages with separate error kinds. The inner document is returned as raw
//! JSON; its shape is not checked here.
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::config::{GatewayConfig, Prompts};
use crate::error::{ConfigError, GatewayError};
use crate::util::{fill_template, trunc_for_log};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct QuizGateway {
  client: reqwest::Client,
  api_key: String,
  pub agent_id: String,
  pub run_url: String,
  prompts: Prompts,
}

impl QuizGateway {
  /// Build the client from explicit configuration. An empty credential is rejected here
  /// rather than sent upstream.
  pub fn new(cfg: GatewayConfig) -> Result<Self, ConfigError> {
    if cfg.api_key.trim().is_empty() {
      return Err(ConfigError::Missing("TRUFFLE_API_KEY"));
    }
    if cfg.agent_id.trim().is_empty() {
      return Err(ConfigError::Missing("TRUFFLE_AGENT_ID"));
    }

    let client = reqwest::Client::builder()
      .timeout(cfg.timeout)
      .build()
      .map_err(ConfigError::Client)?;

    Ok(Self {
      client,
      api_key: cfg.api_key,
      agent_id: cfg.agent_id,
      run_url: cfg.run_url,
      prompts: cfg.prompts,
    })
  }

  /// Natural-language instruction with the three parameters embedded verbatim.
  pub fn instruction(&self, topic: &str, num_questions: &str, difficulty: &str) -> String {
    fill_template(
      &self.prompts.quiz_instruction_template,
      &[("topic", topic), ("num_questions", num_questions), ("difficulty", difficulty)],
    )
  }

  /// Run one generation. Parameters are forwarded as received; validation is the caller's job.
  #[instrument(level = "info", skip(self, topic), fields(topic_len = topic.len(), %num_questions, %difficulty))]
  pub async fn generate(&self, topic: &str, num_questions: &str, difficulty: &str) -> Result<Value, GatewayError> {
    let req = RunRequest {
      agent_id: &self.agent_id,
      input_data: self.instruction(topic, num_questions, difficulty),
      json_mode: true,
    };

    let start = std::time::Instant::now();
    let result = self.run(&req).await;
    let elapsed = start.elapsed();

    match &result {
      Ok(quiz) => {
        let questions = quiz.get("questions").and_then(Value::as_array).map(Vec::len);
        info!(?elapsed, ?questions, "Quiz generated")
      }
      Err(e) => error!(?elapsed, error = %e, "Quiz generation failed"),
    }
    result
  }

  async fn run(&self, req: &RunRequest<'_>) -> Result<Value, GatewayError> {
    let res = self.client.post(&self.run_url)
      .header(USER_AGENT, "quizgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(API_KEY_HEADER, &self.api_key)
      .json(req).send().await?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      return Err(GatewayError::Upstream { status, body: trunc_for_log(&body, 300) });
    }

    let body = res.text().await?;
    decode_run_response(&body)
  }
}

/// Stage one: the outer envelope. Stage two: the JSON text inside `data`.
/// Only text that is not JSON at all fails stage two.
pub fn decode_run_response(body: &str) -> Result<Value, GatewayError> {
  let envelope: RunEnvelope = serde_json::from_str(body).map_err(GatewayError::Envelope)?;
  serde_json::from_str::<Value>(&envelope.data).map_err(GatewayError::InnerPayload)
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct RunRequest<'a> {
  agent_id: &'a str,
  input_data: String,
  json_mode: bool,
}

#[derive(Deserialize)]
struct RunEnvelope {
  data: String,
}

#[cfg(test)]
pub(crate) mod testing {
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
  };
  use serde_json::{json, Value};
  use tokio::net::TcpListener;

  use crate::config::{GatewayConfig, Prompts};

  /// Requests received by the mock upstream: (`x-api-key` header, JSON body).
  #[derive(Clone, Default)]
  pub struct Seen {
    pub calls: Arc<Mutex<Vec<(Option<String>, Value)>>>,
  }

  /// Spawn an in-process upstream that answers every run with `status` and `body`.
  pub async fn mock_upstream(status: StatusCode, body: String, delay: Duration) -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
      .route(
        "/run",
        post(move |State(seen): State<Seen>, headers: HeaderMap, Json(req): Json<Value>| {
          let body = body.clone();
          async move {
            let key = headers.get("x-api-key").and_then(|v| v.to_str().ok()).map(str::to_string);
            seen.calls.lock().unwrap().push((key, req));
            tokio::time::sleep(delay).await;
            (status, body)
          }
        }),
      )
      .with_state(seen.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{}/run", addr), seen)
  }

  pub fn test_config(run_url: String) -> GatewayConfig {
    GatewayConfig {
      api_key: "sk-test".into(),
      agent_id: "agent-42".into(),
      run_url,
      timeout: Duration::from_secs(5),
      prompts: Prompts::default(),
    }
  }

  /// Wrap a quiz the way the generation service does: JSON string inside `data`.
  pub fn envelope(quiz: Value) -> String {
    json!({ "data": quiz.to_string() }).to_string()
  }

  pub fn sample_quiz() -> Value {
    json!({
      "questions": [
        { "question": "Capital of France?", "options": ["Paris", "Rome"], "correctAnswer": "Paris" },
        { "question": "2 + 2?", "options": ["3", "4", "5"], "correctAnswer": "4" }
      ]
    })
  }
}
