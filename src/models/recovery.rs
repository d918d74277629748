use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryCheckin {
  pub id: Uuid,
  pub athlete_id: Uuid,
  pub checkin_date: NaiveDate,
  pub sleep: i64,
  pub soreness: i64,
  pub motivation: i64,
  /// Composite readiness, 0-20
  pub trac_score: i64,
  pub notes: Option<String>,
}

/// For inserting new check-ins (without id, trac_score)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecoveryCheckin {
  pub athlete_id: Option<Uuid>,
  pub checkin_date: Option<NaiveDate>,
  pub sleep: Option<i64>,
  pub soreness: Option<i64>,
  pub motivation: Option<i64>,
  pub notes: Option<String>,
}
