//! Coach platform subscriptions
//!
//! A coach starts a checkout (recorded as `pending`), pays on the gateway, and
//! the gateway's notification moves the subscription to its final state. One
//! row per coach; every write is an upsert keyed by coach id.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CoachSubscription, SubscriptionStatus};
use crate::payments::{
  self, Checkout, ExternalReference, PaymentConfig, PaymentNotification, SubscriptionPlan,
};

/// ---------------------------------------------------------------------------
/// Status Mapping
/// ---------------------------------------------------------------------------

/// Gateway payment status -> subscription status
pub fn status_from_gateway(status: &str) -> SubscriptionStatus {
  match status {
    "approved" => SubscriptionStatus::Active,
    "pending" | "in_process" => SubscriptionStatus::Pending,
    _ => SubscriptionStatus::Inactive,
  }
}

pub fn period_end(approved_at: DateTime<Utc>, plan: &SubscriptionPlan) -> DateTime<Utc> {
  approved_at + Duration::days(plan.period_days)
}

/// ---------------------------------------------------------------------------
/// Request / Response Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCheckout {
  pub user_id: Option<Uuid>,
  pub plan_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStarted {
  #[serde(flatten)]
  pub checkout: Checkout,
  pub plan: SubscriptionPlan,
  pub subscription: CoachSubscription,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotificationOutcome {
  Updated { subscription: CoachSubscription },
  Ignored { reason: String },
}

impl NotificationOutcome {
  fn ignored(reason: impl Into<String>) -> Self {
    let reason = reason.into();
    warn!(%reason, "Ignoring payment notification");
    Self::Ignored { reason }
  }
}

/// ---------------------------------------------------------------------------
/// Database Operations
/// ---------------------------------------------------------------------------

pub async fn upsert_subscription(
  pool: &SqlitePool,
  subscription: &CoachSubscription,
) -> AppResult<CoachSubscription> {
  let stored: CoachSubscription = sqlx::query_as(
    r#"
    INSERT INTO coach_subscriptions (coach_id, plan_id, status, payment_id, amount, current_period_end, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(coach_id) DO UPDATE SET
      plan_id = excluded.plan_id,
      status = excluded.status,
      payment_id = excluded.payment_id,
      amount = excluded.amount,
      current_period_end = excluded.current_period_end,
      updated_at = excluded.updated_at
    RETURNING *
    "#,
  )
  .bind(subscription.coach_id)
  .bind(&subscription.plan_id)
  .bind(subscription.status)
  .bind(&subscription.payment_id)
  .bind(subscription.amount)
  .bind(subscription.current_period_end)
  .bind(subscription.updated_at)
  .fetch_one(pool)
  .await?;

  Ok(stored)
}

pub async fn find_subscription(pool: &SqlitePool, coach_id: Uuid) -> AppResult<Option<CoachSubscription>> {
  let subscription = sqlx::query_as::<_, CoachSubscription>(
    "SELECT * FROM coach_subscriptions WHERE coach_id = ?",
  )
  .bind(coach_id)
  .fetch_optional(pool)
  .await?;
  Ok(subscription)
}

pub async fn get_subscription(pool: &SqlitePool, coach_id: Uuid) -> AppResult<CoachSubscription> {
  find_subscription(pool, coach_id)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Subscription for coach {}", coach_id)))
}

async fn coach_exists(pool: &SqlitePool, coach_id: Uuid) -> AppResult<bool> {
  let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM coaches WHERE id = ?")
    .bind(coach_id)
    .fetch_optional(pool)
    .await?;
  Ok(found.is_some())
}

/// ---------------------------------------------------------------------------
/// Checkout
/// ---------------------------------------------------------------------------

/// Open a checkout on the gateway and record the coach as pending.
///
/// A coach whose subscription is still active keeps that status until the
/// new payment is confirmed. Configuration is only read once the request
/// itself is valid.
pub async fn start_checkout(
  pool: &SqlitePool,
  request: StartCheckout,
  load_config: impl FnOnce() -> AppResult<PaymentConfig>,
) -> AppResult<CheckoutStarted> {
  let coach_id = request
    .user_id
    .ok_or_else(|| AppError::validation("userId is required"))?;
  let plan_id = request
    .plan_id
    .map(|p| p.trim().to_string())
    .filter(|p| !p.is_empty())
    .ok_or_else(|| AppError::validation("planId is required"))?;
  let plan = payments::find_plan(&plan_id)
    .ok_or_else(|| AppError::validation(format!("Unknown plan {:?}", plan_id)))?;

  if !coach_exists(pool, coach_id).await? {
    return Err(AppError::not_found(format!("Coach {}", coach_id)));
  }

  let config = load_config()?;
  let checkout = payments::create_checkout_preference(&config, coach_id, plan).await?;

  let now = Utc::now();
  let subscription = match find_subscription(pool, coach_id).await? {
    Some(current)
      if current.status == SubscriptionStatus::Active
        && current.current_period_end.is_some_and(|end| end > now) =>
    {
      current
    }
    _ => {
      upsert_subscription(
        pool,
        &CoachSubscription {
          coach_id,
          plan_id: plan.id.to_string(),
          status: SubscriptionStatus::Pending,
          payment_id: None,
          amount: Some(plan.price),
          current_period_end: None,
          updated_at: now,
        },
      )
      .await?
    }
  };

  info!(%coach_id, plan = plan.id, preference_id = %checkout.preference_id, "Started checkout");

  Ok(CheckoutStarted {
    checkout,
    plan: *plan,
    subscription,
  })
}

/// ---------------------------------------------------------------------------
/// Gateway Notifications
/// ---------------------------------------------------------------------------

/// Look the payment up on the gateway and apply its status to the coach's
/// subscription. Notifications that cannot be tied to a coach and plan are
/// acknowledged and ignored.
pub async fn process_payment_notification(
  pool: &SqlitePool,
  config: &PaymentConfig,
  payment_id: &str,
) -> AppResult<NotificationOutcome> {
  let payment = payments::fetch_payment(config, payment_id).await?;

  let Some(raw_reference) = payment.external_reference.as_deref() else {
    return Ok(NotificationOutcome::ignored(format!("payment {} has no external reference", payment_id)));
  };
  let reference = match ExternalReference::parse(raw_reference) {
    Ok(reference) => reference,
    Err(err) => return Ok(NotificationOutcome::ignored(err.to_string())),
  };
  let Some(plan) = payments::find_plan(&reference.plan_id) else {
    return Ok(NotificationOutcome::ignored(format!("unknown plan {:?}", reference.plan_id)));
  };
  if !coach_exists(pool, reference.coach_id).await? {
    return Ok(NotificationOutcome::ignored(format!("unknown coach {}", reference.coach_id)));
  }

  let now = Utc::now();
  let status = status_from_gateway(&payment.status);
  let current_period_end = match status {
    SubscriptionStatus::Active => Some(period_end(payment.date_approved.unwrap_or(now), plan)),
    _ => None,
  };

  let subscription = upsert_subscription(
    pool,
    &CoachSubscription {
      coach_id: reference.coach_id,
      plan_id: plan.id.to_string(),
      status,
      payment_id: Some(payment.id.to_string()),
      amount: payment.transaction_amount.or(Some(plan.price)),
      current_period_end,
      updated_at: now,
    },
  )
  .await?;

  info!(
    coach_id = %subscription.coach_id,
    payment_id,
    gateway_status = %payment.status,
    status = ?subscription.status,
    "Applied payment notification"
  );

  Ok(NotificationOutcome::Updated { subscription })
}

/// Entry point for the webhook: non-payment notifications are ignored
/// before any configuration is read or gateway call is made.
pub async fn handle_notification(
  pool: &SqlitePool,
  notification: &PaymentNotification,
  query: &HashMap<String, String>,
  load_config: impl FnOnce() -> AppResult<PaymentConfig>,
) -> AppResult<NotificationOutcome> {
  let Some(payment_id) = notification.payment_id(query) else {
    return Ok(NotificationOutcome::Ignored {
      reason: "not a payment notification".into(),
    });
  };

  let config = load_config()?;
  process_payment_notification(pool, &config, &payment_id).await
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
