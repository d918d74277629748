//! Environment configuration
//!
//! Everything is read from the process environment (a `.env` file is loaded at
//! startup). Server settings are read once; payment settings are read per
//! request by `PaymentConfig::from_env`.

use std::env;
use std::net::SocketAddr;

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://powerlog.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  Missing(String),

  #[error("Invalid value for {name}: {value:?}")]
  Invalid { name: String, value: String },
}

/// ---------------------------------------------------------------------------
/// Server Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub database_url: String,
  pub bind_addr: SocketAddr,
  pub max_connections: u32,
}

impl ServerConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let database_url = optional_var("DATABASE_URL", DEFAULT_DATABASE_URL);

    let bind_raw = optional_var("BIND_ADDR", DEFAULT_BIND_ADDR);
    let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
      name: "BIND_ADDR".into(),
      value: bind_raw.clone(),
    })?;

    let max_connections = match env::var("DB_MAX_CONNECTIONS") {
      Ok(raw) => match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
          return Err(ConfigError::Invalid {
            name: "DB_MAX_CONNECTIONS".into(),
            value: raw,
          })
        }
      },
      Err(_) => DEFAULT_MAX_CONNECTIONS,
    };

    Ok(Self {
      database_url,
      bind_addr,
      max_connections,
    })
  }
}

/// Read a variable that must be present and non-blank
pub(crate) fn required_var(name: &str) -> Result<String, ConfigError> {
  match env::var(name) {
    Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
    _ => Err(ConfigError::Missing(name.to_string())),
  }
}

pub(crate) fn optional_var(name: &str, default: &str) -> String {
  env::var(name)
    .ok()
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty())
    .unwrap_or_else(|| default.to_string())
}
