use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BlockStatus {
  #[default]
  Draft,
  Active,
  Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrainingBlock {
  pub id: Uuid,
  pub coach_id: Uuid,
  pub athlete_id: Uuid,
  pub name: String,
  pub total_weeks: i64,
  pub status: BlockStatus,
  pub start_date: Option<NaiveDate>,
  pub created_at: DateTime<Utc>,
}

/// For creating blocks (without id, created_at)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrainingBlock {
  pub coach_id: Option<Uuid>,
  pub athlete_id: Option<Uuid>,
  pub name: Option<String>,
  #[serde(default)]
  pub total_weeks: i64,
  #[serde(default)]
  pub status: BlockStatus,
  pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrainingDay {
  pub id: Uuid,
  pub block_id: Uuid,
  pub week_number: i64,
  pub day_number: i64,
  pub scheduled_date: Option<NaiveDate>,
  pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrainingDay {
  pub week_number: i64,
  pub day_number: i64,
  pub scheduled_date: Option<NaiveDate>,
  pub name: Option<String>,
}

/// An exercise assigned to a day. `exercise_id` points at the movement catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DayExercise {
  pub id: Uuid,
  pub training_day_id: Uuid,
  pub exercise_id: Uuid,
  pub target_sets: i64,
  pub order_index: i64,
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDayExercise {
  pub exercise_id: Option<Uuid>,
  #[serde(default)]
  pub target_sets: i64,
  #[serde(default)]
  pub order_index: i64,
  pub notes: Option<String>,
}

/// A planned (target) set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSet {
  pub id: Uuid,
  pub day_exercise_id: Uuid,
  pub set_number: i64,
  pub target_reps: Option<i64>,
  pub target_weight: Option<f64>,
  pub target_rpe: Option<f64>,
  pub target_percentage: Option<f64>,
}

/// One row of a bulk target-set update. `None` fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSetUpdate {
  pub id: Uuid,
  pub target_reps: Option<i64>,
  pub target_weight: Option<f64>,
  pub target_rpe: Option<f64>,
  pub target_percentage: Option<f64>,
}

/// ---------------------------------------------------------------------------
/// Plan tree (block -> days -> exercises -> sets)
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedExercise {
  #[serde(flatten)]
  pub exercise: DayExercise,
  pub exercise_name: Option<String>,
  pub sets: Vec<ExerciseSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedDay {
  #[serde(flatten)]
  pub day: TrainingDay,
  pub exercises: Vec<PlannedExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPlan {
  pub block: TrainingBlock,
  pub days: Vec<PlannedDay>,
}

#[cfg(test)]
impl BlockPlan {
  /// Highest week number present in the plan, if any day exists
  pub fn last_week(&self) -> Option<i64> {
    self.days.iter().map(|d| d.day.week_number).max()
  }

  pub fn days_in_week(&self, week_number: i64) -> impl Iterator<Item = &PlannedDay> {
    self.days.iter().filter(move |d| d.day.week_number == week_number)
  }
}
