//! Structured logging setup
//!
//! `RUST_LOG` controls filtering, `LOG_FORMAT` picks the output format
//! (`json`, `compact`, anything else is pretty).

use std::env;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,powerlog_lib=debug,tower_http=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Json,
  Compact,
  Pretty,
}

impl LogFormat {
  pub fn from_env() -> Self {
    Self::parse(env::var("LOG_FORMAT").ok().as_deref())
  }

  fn parse(raw: Option<&str>) -> Self {
    match raw.map(str::trim) {
      Some("json") => Self::Json,
      Some("compact") => Self::Compact,
      _ => Self::Pretty,
    }
  }
}

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
  let registry = tracing_subscriber::registry().with(filter);

  let result = match LogFormat::from_env() {
    LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true)).try_init(),
    LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
  };

  if result.is_err() {
    tracing::debug!("tracing subscriber already installed");
  }
}
