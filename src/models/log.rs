use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A performed set, as recorded by the athlete
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
  pub id: Uuid,
  pub day_exercise_id: Uuid,
  pub athlete_id: Uuid,
  pub set_number: i64,
  pub actual_weight: Option<f64>,
  pub actual_reps: Option<i64>,
  pub actual_rpe: Option<f64>,
  pub completed_at: DateTime<Utc>,
  pub notes: Option<String>,
}

/// For recording new sets (without id). `completed_at` defaults to now.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExerciseLog {
  pub day_exercise_id: Option<Uuid>,
  pub athlete_id: Option<Uuid>,
  pub set_number: Option<i64>,
  pub actual_weight: Option<f64>,
  pub actual_reps: Option<i64>,
  pub actual_rpe: Option<f64>,
  pub completed_at: Option<DateTime<Utc>>,
  pub notes: Option<String>,
}

/// A log joined with its exercise, day and block metadata (input to reporting)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSet {
  pub log_id: Uuid,
  pub athlete_id: Uuid,
  pub block_id: Uuid,
  pub block_name: String,
  pub week_number: i64,
  pub day_number: i64,
  pub exercise_id: Uuid,
  pub exercise_name: String,
  pub category: String,
  pub set_number: i64,
  pub weight: Option<f64>,
  pub reps: Option<i64>,
  pub rpe: Option<f64>,
  pub completed_at: DateTime<Utc>,
}
