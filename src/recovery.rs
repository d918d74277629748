//! Daily recovery check-ins scored with TRAC
//!
//! Sleep and motivation count up, soreness counts down. All three are
//! self-reported on a 0-10 scale.

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::metrics::{trac_score, TRAC_COMPONENT_MAX};
use crate::models::{NewRecoveryCheckin, RecoveryCheckin};

fn component(name: &str, value: Option<i64>) -> AppResult<i64> {
  let value = value.ok_or_else(|| AppError::validation(format!("{} is required", name)))?;
  if !(0..=TRAC_COMPONENT_MAX).contains(&value) {
    return Err(AppError::validation(format!(
      "{} must be between 0 and {}",
      name, TRAC_COMPONENT_MAX
    )));
  }
  Ok(value)
}

/// Record a check-in; one per athlete per day, defaulting to today
pub async fn record_checkin(pool: &SqlitePool, checkin: NewRecoveryCheckin) -> AppResult<RecoveryCheckin> {
  let athlete_id = checkin
    .athlete_id
    .ok_or_else(|| AppError::validation("athleteId is required"))?;
  let sleep = component("sleep", checkin.sleep)?;
  let soreness = component("soreness", checkin.soreness)?;
  let motivation = component("motivation", checkin.motivation)?;
  let checkin_date = checkin.checkin_date.unwrap_or_else(|| Utc::now().date_naive());

  let stored: RecoveryCheckin = sqlx::query_as(
    r#"
    INSERT INTO recovery_checkins (id, athlete_id, checkin_date, sleep, soreness, motivation, trac_score, notes)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    RETURNING *
    "#,
  )
  .bind(Uuid::new_v4())
  .bind(athlete_id)
  .bind(checkin_date)
  .bind(sleep)
  .bind(soreness)
  .bind(motivation)
  .bind(trac_score(sleep, soreness, motivation))
  .bind(checkin.notes)
  .fetch_one(pool)
  .await?;

  debug!(%athlete_id, %checkin_date, trac = stored.trac_score, "Recorded recovery check-in");
  Ok(stored)
}

/// Check-ins for an athlete, newest first, optionally limited to a date window
pub async fn list_checkins(
  pool: &SqlitePool,
  athlete_id: Uuid,
  from: Option<NaiveDate>,
  to: Option<NaiveDate>,
) -> AppResult<Vec<RecoveryCheckin>> {
  let mut builder: QueryBuilder<Sqlite> =
    QueryBuilder::new("SELECT * FROM recovery_checkins WHERE athlete_id = ");
  builder.push_bind(athlete_id);
  if let Some(from) = from {
    builder.push(" AND checkin_date >= ").push_bind(from);
  }
  if let Some(to) = to {
    builder.push(" AND checkin_date <= ").push_bind(to);
  }
  builder.push(" ORDER BY checkin_date DESC");

  let checkins = builder.build_query_as::<RecoveryCheckin>().fetch_all(pool).await?;
  Ok(checkins)
}
