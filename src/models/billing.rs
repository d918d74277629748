use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BillingStatus {
  #[default]
  Pending,
  Paid,
  Overdue,
  Cancelled,
}

/// A charge a coach issues to one of their athletes
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
  pub id: Uuid,
  pub coach_id: Uuid,
  pub athlete_id: Uuid,
  pub amount: f64,
  pub currency: String,
  pub description: Option<String>,
  pub due_date: NaiveDate,
  pub status: BillingStatus,
  pub paid_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBilling {
  pub coach_id: Option<Uuid>,
  pub athlete_id: Option<Uuid>,
  pub amount: Option<f64>,
  pub currency: Option<String>,
  pub description: Option<String>,
  pub due_date: Option<NaiveDate>,
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingUpdate {
  pub amount: Option<f64>,
  /// `None` keeps the description, `Some(None)` (JSON `null`) clears it
  #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
  pub description: Option<Option<String>>,
  pub due_date: Option<NaiveDate>,
  pub status: Option<BillingStatus>,
}

/// Distinguishes an explicit `null` from an absent field
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}
