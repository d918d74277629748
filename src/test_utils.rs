//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for roster and training plans
//! - Mock data factories
//! - Router request helpers
//! - Helper assertions

use crate::db::AppState;
use crate::models::{BlockStatus, ExerciseLog, LoggedSet, TrainingBlock};
use crate::routes;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Ids created by `seed_test_roster`
#[derive(Debug, Clone, Copy)]
pub struct TestRoster {
  pub coach_id: Uuid,
  pub athlete_id: Uuid,
  pub squat_id: Uuid,
  pub bench_id: Uuid,
  pub deadlift_id: Uuid,
}

/// Seed one coach, one athlete and the three competition lifts
pub async fn seed_test_roster(pool: &SqlitePool) -> TestRoster {
  let roster = TestRoster {
    coach_id: Uuid::new_v4(),
    athlete_id: Uuid::new_v4(),
    squat_id: Uuid::new_v4(),
    bench_id: Uuid::new_v4(),
    deadlift_id: Uuid::new_v4(),
  };

  sqlx::query("INSERT INTO coaches (id, name, email) VALUES (?1, 'Test Coach', 'coach@example.com')")
    .bind(roster.coach_id)
    .execute(pool)
    .await
    .expect("Failed to seed coach");

  sqlx::query("INSERT INTO athletes (id, coach_id, name) VALUES (?1, ?2, 'Test Athlete')")
    .bind(roster.athlete_id)
    .bind(roster.coach_id)
    .execute(pool)
    .await
    .expect("Failed to seed athlete");

  for (id, name, category) in [
    (roster.squat_id, "Back Squat", "squat"),
    (roster.bench_id, "Bench Press", "bench"),
    (roster.deadlift_id, "Deadlift", "deadlift"),
  ] {
    sqlx::query("INSERT INTO exercises (id, name, category) VALUES (?1, ?2, ?3)")
      .bind(id)
      .bind(name)
      .bind(category)
      .execute(pool)
      .await
      .expect("Failed to seed exercise");
  }

  roster
}

/// Seed a training block for the roster's athlete
pub async fn seed_test_block(pool: &SqlitePool, roster: &TestRoster, total_weeks: i64) -> Uuid {
  let block_id = Uuid::new_v4();

  sqlx::query(
    r#"
    INSERT INTO training_blocks (id, coach_id, athlete_id, name, total_weeks, status, start_date, created_at)
    VALUES (?1, ?2, ?3, 'Meet Prep', ?4, 'active', ?5, ?6)
    "#,
  )
  .bind(block_id)
  .bind(roster.coach_id)
  .bind(roster.athlete_id)
  .bind(total_weeks)
  .bind(date(2024, 1, 1))
  .bind(Utc::now())
  .execute(pool)
  .await
  .expect("Failed to seed training block");

  block_id
}

/// Ids created by `seed_test_day`
#[derive(Debug, Clone)]
pub struct SeededDay {
  pub day_id: Uuid,
  pub exercise_ids: Vec<Uuid>,
  pub set_ids: Vec<Uuid>,
}

/// Seed one day with the given exercises, each with its target sets as (reps, weight)
pub async fn seed_test_day(
  pool: &SqlitePool,
  block_id: Uuid,
  week_number: i64,
  day_number: i64,
  scheduled_date: Option<NaiveDate>,
  exercises: &[(Uuid, &[(i64, f64)])],
) -> SeededDay {
  let day_id = Uuid::new_v4();

  sqlx::query(
    r#"
    INSERT INTO training_days (id, block_id, week_number, day_number, scheduled_date, name)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
  )
  .bind(day_id)
  .bind(block_id)
  .bind(week_number)
  .bind(day_number)
  .bind(scheduled_date)
  .bind(format!("W{}D{}", week_number, day_number))
  .execute(pool)
  .await
  .expect("Failed to seed training day");

  let mut exercise_ids = Vec::new();
  let mut set_ids = Vec::new();

  for (order_index, (exercise_id, sets)) in exercises.iter().enumerate() {
    let day_exercise_id = Uuid::new_v4();

    sqlx::query(
      r#"
      INSERT INTO day_exercises (id, training_day_id, exercise_id, target_sets, order_index, notes)
      VALUES (?1, ?2, ?3, ?4, ?5, 'belt on top sets')
      "#,
    )
    .bind(day_exercise_id)
    .bind(day_id)
    .bind(exercise_id)
    .bind(sets.len() as i64)
    .bind(order_index as i64)
    .execute(pool)
    .await
    .expect("Failed to seed day exercise");

    for (i, (reps, weight)) in sets.iter().enumerate() {
      let set_id = Uuid::new_v4();

      sqlx::query(
        r#"
        INSERT INTO exercise_sets (id, day_exercise_id, set_number, target_reps, target_weight, target_rpe, target_percentage)
        VALUES (?1, ?2, ?3, ?4, ?5, 8.0, 75.0)
        "#,
      )
      .bind(set_id)
      .bind(day_exercise_id)
      .bind(i as i64 + 1)
      .bind(reps)
      .bind(weight)
      .execute(pool)
      .await
      .expect("Failed to seed exercise set");

      set_ids.push(set_id);
    }

    exercise_ids.push(day_exercise_id);
  }

  SeededDay {
    day_id,
    exercise_ids,
    set_ids,
  }
}

/// Seed a performed set
pub async fn seed_test_log(
  pool: &SqlitePool,
  day_exercise_id: Uuid,
  athlete_id: Uuid,
  set_number: i64,
  (weight, reps, rpe): (f64, i64, Option<f64>),
  completed_at: DateTime<Utc>,
) -> Uuid {
  let log_id = Uuid::new_v4();

  sqlx::query(
    r#"
    INSERT INTO exercise_logs (id, day_exercise_id, athlete_id, set_number, actual_weight, actual_reps, actual_rpe, completed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    "#,
  )
  .bind(log_id)
  .bind(day_exercise_id)
  .bind(athlete_id)
  .bind(set_number)
  .bind(weight)
  .bind(reps)
  .bind(rpe)
  .bind(completed_at)
  .execute(pool)
  .await
  .expect("Failed to seed exercise log");

  log_id
}

/// Count rows in a table
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
  sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
    .fetch_one(pool)
    .await
    .expect("Failed to count rows")
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn mock_block(total_weeks: i64) -> TrainingBlock {
  TrainingBlock {
    id: Uuid::new_v4(),
    coach_id: Uuid::new_v4(),
    athlete_id: Uuid::new_v4(),
    name: "Hypertrophy".to_string(),
    total_weeks,
    status: BlockStatus::Active,
    start_date: Some(date(2024, 1, 1)),
    created_at: Utc::now(),
  }
}

pub fn mock_log(weight: f64, reps: i64, rpe: Option<f64>) -> ExerciseLog {
  ExerciseLog {
    id: Uuid::new_v4(),
    day_exercise_id: Uuid::new_v4(),
    athlete_id: Uuid::new_v4(),
    set_number: 1,
    actual_weight: Some(weight),
    actual_reps: Some(reps),
    actual_rpe: rpe,
    completed_at: Utc::now(),
    notes: None,
  }
}

/// A joined log row for reporting tests
pub fn mock_logged_set(
  block: &TrainingBlock,
  week_number: i64,
  exercise: (Uuid, &str, &str),
  (weight, reps, rpe): (f64, i64, Option<f64>),
  completed_at: DateTime<Utc>,
) -> LoggedSet {
  let (exercise_id, exercise_name, category) = exercise;
  LoggedSet {
    log_id: Uuid::new_v4(),
    athlete_id: block.athlete_id,
    block_id: block.id,
    block_name: block.name.clone(),
    week_number,
    day_number: 1,
    exercise_id,
    exercise_name: exercise_name.to_string(),
    category: category.to_string(),
    set_number: 1,
    weight: Some(weight),
    reps: Some(reps),
    rpe,
    completed_at,
  }
}

/// ---------------------------------------------------------------------------
/// Router Helpers
/// ---------------------------------------------------------------------------

/// Full application router over a test pool
pub fn test_app(pool: &SqlitePool) -> Router {
  routes::router(Arc::new(AppState::new(pool.clone())))
}

/// Send one request through the router and decode the response body.
///
/// Empty bodies decode to `Value::Null`; non-JSON bodies (extractor
/// rejections) come back as `Value::String`.
pub async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let request = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string())),
    None => builder.body(Body::empty()),
  }
  .expect("Failed to build request");

  let response = app.clone().oneshot(request).await.expect("Router should not fail");
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .expect("Failed to read body");

  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
  };
  (status, value)
}

/// Parse a uuid out of a JSON response field
pub fn json_id(value: &Value, field: &str) -> Uuid {
  value[field]
    .as_str()
    .and_then(|raw| Uuid::parse_str(raw).ok())
    .unwrap_or_else(|| panic!("response has no uuid field {:?}: {}", field, value))
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Create a DateTime N days ago from now
pub fn datetime_days_ago(days: i64) -> DateTime<Utc> {
  Utc::now() - Duration::days(days)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    // Verify key tables exist
    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('training_blocks', 'training_days', 'day_exercises', 'exercise_sets', 'exercise_logs')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 5, "Expected 5 plan tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_day_creates_tree() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let block_id = seed_test_block(&pool, &roster, 1).await;

    let seeded = seed_test_day(
      &pool,
      block_id,
      1,
      1,
      Some(date(2024, 1, 1)),
      &[(roster.squat_id, &[(5, 100.0), (5, 100.0)]), (roster.bench_id, &[(8, 70.0)])],
    )
    .await;

    assert_eq!(seeded.exercise_ids.len(), 2);
    assert_eq!(seeded.set_ids.len(), 3);
    assert_eq!(count_rows(&pool, "exercise_sets").await, 3);

    teardown_test_db(pool).await;
  }
}
