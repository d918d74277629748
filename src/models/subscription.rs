use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum SubscriptionStatus {
  Pending,
  Active,
  Inactive,
}

/// One row per coach; upserted on checkout start and on every gateway notification
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CoachSubscription {
  pub coach_id: Uuid,
  pub plan_id: String,
  pub status: SubscriptionStatus,
  pub payment_id: Option<String>,
  pub amount: Option<f64>,
  pub current_period_end: Option<DateTime<Utc>>,
  pub updated_at: DateTime<Utc>,
}
