//! Configuration: Gateway settings from the environment plus optional prompt overrides from TOML.
//!
//! Environment:
//!   PORT                          : u16 (default 3000)
//!   TRUFFLE_API_KEY               : credential for the generation service (required)
//!   TRUFFLE_AGENT_ID              : agent identifier sent with each run (required)
//!   TRUFFLE_RUN_URL               : default "https://trytruffle.ai/api/v0/run" (blank = default)
//!   QUIZ_GENERATION_TIMEOUT_SECS  : default 60
//!   QUIZ_CONFIG_PATH              : path to TOML config (prompts)
//!
//! Numeric values that do not parse are errors, not silent defaults.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::ConfigError;

pub const DEFAULT_RUN_URL: &str = "https://trytruffle.ai/api/v0/run";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PORT: u16 = 3000;

/// Everything the Gateway needs. Built once at startup and handed to `QuizGateway::new`.
#[derive(Clone)]
pub struct GatewayConfig {
  pub api_key: String,
  pub agent_id: String,
  pub run_url: String,
  pub timeout: Duration,
  pub prompts: Prompts,
}

// Hand-written so the credential never ends up in a log line.
impl std::fmt::Debug for GatewayConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GatewayConfig")
      .field("api_key", &"<redacted>")
      .field("agent_id", &self.agent_id)
      .field("run_url", &self.run_url)
      .field("timeout", &self.timeout)
      .finish()
  }
}

impl GatewayConfig {
  /// Read from the process environment. Fails fast on a missing credential.
  pub fn from_env() -> Result<Self, ConfigError> {
    let prompts = load_agent_config_from_env()
      .map(|c| c.prompts)
      .unwrap_or_default();

    Ok(Self {
      api_key: get_env("TRUFFLE_API_KEY")?,
      agent_id: get_env("TRUFFLE_AGENT_ID")?,
      run_url: get_env_or("TRUFFLE_RUN_URL", DEFAULT_RUN_URL),
      timeout: Duration::from_secs(get_env_parse_or("QUIZ_GENERATION_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
      prompts,
    })
  }
}

/// Listening port from `PORT`.
pub fn listen_port() -> Result<u16, ConfigError> {
  get_env_parse_or("PORT", DEFAULT_PORT)
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Instruction sent to the generation agent.
/// Placeholders: `{topic}`, `{num_questions}`, `{difficulty}`.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  pub quiz_instruction_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_instruction_template:
        "Create a quiz on {topic} with {num_questions} questions at {difficulty} difficulty.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "quizgen_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizgen_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizgen_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

/// Blank values count as absent.
fn get_env(name: &'static str) -> Result<String, ConfigError> {
  match std::env::var(name) {
    Ok(v) if !v.trim().is_empty() => Ok(v),
    _ => Err(ConfigError::Missing(name)),
  }
}

fn get_env_or(name: &'static str, default: &str) -> String {
  get_env(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match std::env::var(name) {
    Ok(raw) => raw
      .trim()
      .parse()
      .map_err(|e: T::Err| ConfigError::Invalid { name, reason: e.to_string() }),
    Err(_) => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn toml_overrides_prompt() {
    let cfg = parse_agent_config(
      r#"
[prompts]
quiz_instruction_template = "Quiz about {topic}: {num_questions} items, {difficulty}."
"#,
    )
    .unwrap();
    assert_eq!(cfg.prompts.quiz_instruction_template, "Quiz about {topic}: {num_questions} items, {difficulty}.");
  }

  #[test]
  fn empty_toml_keeps_default_prompt() {
    let cfg = parse_agent_config("").unwrap();
    assert!(cfg.prompts.quiz_instruction_template.starts_with("Create a quiz on {topic}"));
  }

  // Each test below owns its variable names, so parallel tests never race on them.

  #[test]
  fn unparseable_number_is_an_error() {
    std::env::set_var("QUIZGEN_TEST_PORT_GARBAGE", "abc");
    let err = get_env_parse_or("QUIZGEN_TEST_PORT_GARBAGE", DEFAULT_PORT).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { name: "QUIZGEN_TEST_PORT_GARBAGE", .. }));

    std::env::set_var("QUIZGEN_TEST_PORT_OVERFLOW", "70000");
    assert!(get_env_parse_or("QUIZGEN_TEST_PORT_OVERFLOW", DEFAULT_PORT).is_err());

    std::env::set_var("QUIZGEN_TEST_PORT_SET", " 8080 ");
    assert_eq!(get_env_parse_or("QUIZGEN_TEST_PORT_SET", DEFAULT_PORT).unwrap(), 8080);
    assert_eq!(get_env_parse_or("QUIZGEN_TEST_PORT_UNSET", DEFAULT_PORT).unwrap(), DEFAULT_PORT);
  }

  #[test]
  fn blank_url_falls_back_to_default() {
    std::env::set_var("QUIZGEN_TEST_URL_BLANK", "   ");
    assert_eq!(get_env_or("QUIZGEN_TEST_URL_BLANK", DEFAULT_RUN_URL), DEFAULT_RUN_URL);
    assert_eq!(get_env_or("QUIZGEN_TEST_URL_UNSET", DEFAULT_RUN_URL), DEFAULT_RUN_URL);

    std::env::set_var("QUIZGEN_TEST_URL_SET", "http://localhost:9000/run");
    assert_eq!(get_env_or("QUIZGEN_TEST_URL_SET", DEFAULT_RUN_URL), "http://localhost:9000/run");
  }

  #[test]
  fn debug_redacts_credential() {
    let cfg = GatewayConfig {
      api_key: "sk-secret".into(),
      agent_id: "agent".into(),
      run_url: DEFAULT_RUN_URL.into(),
      timeout: Duration::from_secs(1),
      prompts: Prompts::default(),
    };
    let dbg = format!("{:?}", cfg);
    assert!(!dbg.contains("sk-secret"));
    assert!(dbg.contains("<redacted>"));
  }
}
