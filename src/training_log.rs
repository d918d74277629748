//! Performed sets: recording, listing and the joined read used by reporting.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ExerciseLog, LoggedSet, NewExerciseLog};

/// ---------------------------------------------------------------------------
/// Validation
/// ---------------------------------------------------------------------------

fn validate_new_log(log: &NewExerciseLog) -> AppResult<(Uuid, Uuid, i64)> {
  let day_exercise_id = log
    .day_exercise_id
    .ok_or_else(|| AppError::validation("dayExerciseId is required"))?;
  let athlete_id = log
    .athlete_id
    .ok_or_else(|| AppError::validation("athleteId is required"))?;
  let set_number = log
    .set_number
    .ok_or_else(|| AppError::validation("setNumber is required"))?;

  if set_number < 1 {
    return Err(AppError::validation("setNumber must be at least 1"));
  }
  if matches!(log.actual_reps, Some(r) if r < 0) {
    return Err(AppError::validation("actualReps must not be negative"));
  }
  if matches!(log.actual_weight, Some(w) if !w.is_finite() || w < 0.0) {
    return Err(AppError::validation("actualWeight must not be negative"));
  }
  if matches!(log.actual_rpe, Some(r) if !(1.0..=10.0).contains(&r)) {
    return Err(AppError::validation("actualRpe must be between 1 and 10"));
  }

  Ok((day_exercise_id, athlete_id, set_number))
}

/// ---------------------------------------------------------------------------
/// Database Operations
/// ---------------------------------------------------------------------------

/// Record one performed set. Only the athlete the block is planned for may
/// log against it. A repeated set number for the same exercise and athlete is
/// rejected by the unique constraint.
pub async fn record_log(pool: &SqlitePool, new_log: NewExerciseLog) -> AppResult<ExerciseLog> {
  let (day_exercise_id, athlete_id, set_number) = validate_new_log(&new_log)?;

  let owner: Option<Uuid> = sqlx::query_scalar(
    r#"
    SELECT tb.athlete_id
    FROM day_exercises de
    JOIN training_days td ON td.id = de.training_day_id
    JOIN training_blocks tb ON tb.id = td.block_id
    WHERE de.id = ?
    "#,
  )
  .bind(day_exercise_id)
  .fetch_optional(pool)
  .await?;

  match owner {
    None => return Err(AppError::not_found(format!("Day exercise {}", day_exercise_id))),
    Some(owner) if owner != athlete_id => {
      return Err(AppError::validation("athlete is not assigned to this training block"));
    }
    Some(_) => {}
  }

  let log: ExerciseLog = sqlx::query_as(
    r#"
    INSERT INTO exercise_logs
      (id, day_exercise_id, athlete_id, set_number, actual_weight, actual_reps, actual_rpe, completed_at, notes)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    RETURNING *
    "#,
  )
  .bind(Uuid::new_v4())
  .bind(day_exercise_id)
  .bind(athlete_id)
  .bind(set_number)
  .bind(new_log.actual_weight)
  .bind(new_log.actual_reps)
  .bind(new_log.actual_rpe)
  .bind(new_log.completed_at.unwrap_or_else(Utc::now))
  .bind(new_log.notes)
  .fetch_one(pool)
  .await?;

  debug!(log_id = %log.id, %athlete_id, set_number, "Recorded set");
  Ok(log)
}

/// List logs by athlete and/or day exercise, most recent first
pub async fn list_logs(
  pool: &SqlitePool,
  athlete_id: Option<Uuid>,
  day_exercise_id: Option<Uuid>,
) -> AppResult<Vec<ExerciseLog>> {
  let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM exercise_logs WHERE 1 = 1");
  if let Some(athlete_id) = athlete_id {
    builder.push(" AND athlete_id = ").push_bind(athlete_id);
  }
  if let Some(day_exercise_id) = day_exercise_id {
    builder.push(" AND day_exercise_id = ").push_bind(day_exercise_id);
  }
  builder.push(" ORDER BY completed_at DESC, set_number");

  let logs = builder.build_query_as::<ExerciseLog>().fetch_all(pool).await?;
  Ok(logs)
}

pub async fn delete_log(pool: &SqlitePool, log_id: Uuid) -> AppResult<()> {
  let result = sqlx::query("DELETE FROM exercise_logs WHERE id = ?")
    .bind(log_id)
    .execute(pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::not_found(format!("Exercise log {}", log_id)));
  }

  info!(%log_id, "Deleted exercise log");
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Reporting reads
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct LoggedSetFilter {
  pub athlete_id: Uuid,
  pub exercise_id: Option<Uuid>,
  /// Inclusive lower bound on `completed_at`
  pub since: Option<DateTime<Utc>>,
  /// Inclusive upper bound on `completed_at`
  pub until: Option<DateTime<Utc>>,
}

/// Logs joined with exercise, day and block metadata, oldest first
pub async fn load_logged_sets(pool: &SqlitePool, filter: &LoggedSetFilter) -> AppResult<Vec<LoggedSet>> {
  let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
    r#"
    SELECT
      l.id AS log_id,
      l.athlete_id,
      tb.id AS block_id,
      tb.name AS block_name,
      td.week_number,
      td.day_number,
      e.id AS exercise_id,
      e.name AS exercise_name,
      e.category,
      l.set_number,
      l.actual_weight AS weight,
      l.actual_reps AS reps,
      l.actual_rpe AS rpe,
      l.completed_at
    FROM exercise_logs l
    JOIN day_exercises de ON de.id = l.day_exercise_id
    JOIN training_days td ON td.id = de.training_day_id
    JOIN training_blocks tb ON tb.id = td.block_id
    JOIN exercises e ON e.id = de.exercise_id
    WHERE l.athlete_id = "#,
  );
  builder.push_bind(filter.athlete_id);
  if let Some(exercise_id) = filter.exercise_id {
    builder.push(" AND e.id = ").push_bind(exercise_id);
  }
  if let Some(since) = filter.since {
    builder.push(" AND l.completed_at >= ").push_bind(since);
  }
  if let Some(until) = filter.until {
    builder.push(" AND l.completed_at <= ").push_bind(until);
  }
  builder.push(" ORDER BY l.completed_at, l.set_number");

  let sets = builder.build_query_as::<LoggedSet>().fetch_all(pool).await?;
  Ok(sets)
}

/// Highest week with at least one logged set, per block, over all time
pub async fn load_last_logged_weeks(pool: &SqlitePool, athlete_id: Uuid) -> AppResult<HashMap<Uuid, i64>> {
  let rows: Vec<(Uuid, i64)> = sqlx::query_as(
    r#"
    SELECT td.block_id, MAX(td.week_number)
    FROM exercise_logs l
    JOIN day_exercises de ON de.id = l.day_exercise_id
    JOIN training_days td ON td.id = de.training_day_id
    WHERE l.athlete_id = ?
    GROUP BY td.block_id
    "#,
  )
  .bind(athlete_id)
  .fetch_all(pool)
  .await?;

  Ok(rows.into_iter().collect())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
