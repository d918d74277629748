//! Coach subscriptions and the payment gateway webhook

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::db::AppState;
use crate::error::{AppError, AppResult};
use crate::models::CoachSubscription;
use crate::payments::{PaymentConfig, PaymentNotification, WEBHOOK_PATH};
use crate::subscriptions::{self, CheckoutStarted, NotificationOutcome, StartCheckout};

fn payment_config() -> AppResult<PaymentConfig> {
  PaymentConfig::from_env().map_err(AppError::from)
}

pub struct SubscriptionRoutes;

impl SubscriptionRoutes {
  pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
      .route("/api/subscriptions", post(Self::handle_start_checkout))
      .route("/api/subscriptions/:coach_id", get(Self::handle_get))
      .route(WEBHOOK_PATH, post(Self::handle_webhook))
      .with_state(state)
  }

  async fn handle_start_checkout(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartCheckout>,
  ) -> AppResult<(StatusCode, Json<CheckoutStarted>)> {
    let started = subscriptions::start_checkout(&state.db, body, payment_config).await?;
    Ok((StatusCode::CREATED, Json(started)))
  }

  async fn handle_get(
    State(state): State<Arc<AppState>>,
    Path(coach_id): Path<Uuid>,
  ) -> AppResult<Json<CoachSubscription>> {
    Ok(Json(subscriptions::get_subscription(&state.db, coach_id).await?))
  }

  /// Always answers 200 unless the gateway lookup itself fails, so the
  /// gateway stops retrying notifications we cannot use.
  async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<PaymentNotification>>,
  ) -> AppResult<Json<NotificationOutcome>> {
    let notification = body.map(|Json(n)| n).unwrap_or_default();
    let outcome = subscriptions::handle_notification(&state.db, &notification, &query, payment_config).await?;
    Ok(Json(outcome))
  }
}
