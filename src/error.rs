//! Request-boundary error type
//!
//! Module-level errors (`ConfigError`, `PaymentError`, `DuplicationError`)
//! convert into `AppError`, which renders as a JSON `{"error": ...}` body.
//! Validation and lookup failures carry their message to the caller; upstream
//! failures are logged and surfaced as a generic 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;
use crate::duplication::DuplicationError;
use crate::payments::PaymentError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("{0}")]
  Validation(String),

  #[error("{0} not found")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("Database error: {0}")]
  Database(sqlx::Error),

  #[error("Payment gateway error: {0}")]
  Payment(#[from] PaymentError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl AppError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn not_found(what: impl Into<String>) -> Self {
    Self::NotFound(what.into())
  }

  pub fn status_code(&self) -> StatusCode {
    match self {
      Self::Validation(_) => StatusCode::BAD_REQUEST,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Database(_) | Self::Payment(_) | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  /// Message safe to return to the caller
  fn public_message(&self) -> String {
    match self {
      Self::Validation(_) | Self::NotFound(_) | Self::Conflict(_) => self.to_string(),
      Self::Database(_) | Self::Config(_) => "Internal server error".to_string(),
      Self::Payment(_) => "Payment provider request failed".to_string(),
    }
  }
}

/// Constraint violations are caller mistakes (duplicate set number, unknown
/// parent id), everything else is an upstream failure.
impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    if let Some(db_err) = err.as_database_error() {
      if db_err.is_unique_violation() {
        return Self::Validation("A record with the same key already exists".into());
      }
      if db_err.is_foreign_key_violation() {
        return Self::Validation("Referenced record does not exist".into());
      }
    }
    Self::Database(err)
  }
}

impl From<DuplicationError> for AppError {
  fn from(err: DuplicationError) -> Self {
    match err {
      DuplicationError::BlockNotFound(id) => Self::NotFound(format!("Training block {}", id)),
      DuplicationError::NothingToDuplicate(_) => Self::Conflict(err.to_string()),
      DuplicationError::OrphanReference { .. } => Self::Validation(err.to_string()),
      DuplicationError::Database(e) => Self::Database(e),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.public_message() }))).into_response()
  }
}
