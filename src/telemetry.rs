//! Log setup for the quiz backend.
//!
//! Targets worth filtering on:
//!   session          state machine transitions (debug), generation outcomes (info/warn)
//!   scoring          only questions that cannot be scored (warn)
//!   quizgen_backend  startup, gateway calls, WebSocket connections
//!
//! `LOG_LEVEL` replaces [`DEFAULT_FILTER`] entirely when set; directives that do not parse
//! fall back to the default. `LOG_FORMAT=json` switches to one JSON object per line.
//! Each WebSocket connection logs inside a `quiz_session` span carrying its id.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,session=debug,scoring=warn,quizgen_backend=debug,tower_http=info,axum=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Directives to use for a given `LOG_LEVEL` value.
pub fn filter_directives(level: Option<&str>) -> &str {
    match level.map(str::trim) {
        Some(l) if !l.is_empty() && EnvFilter::try_new(l).is_ok() => l,
        _ => DEFAULT_FILTER,
    }
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let filter = EnvFilter::new(filter_directives(level.as_deref()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match LogFormat::from_setting(std::env::var("LOG_FORMAT").ok().as_deref()) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
