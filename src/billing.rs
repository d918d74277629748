//! Coach -> athlete billing records
//!
//! Plain CRUD. Status changes to `paid` stamp `paid_at`; moving away from
//! `paid` clears it.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Billing, BillingStatus, BillingUpdate, NewBilling};

pub const DEFAULT_CURRENCY: &str = "USD";

fn validate_amount(amount: f64) -> AppResult<()> {
  if !amount.is_finite() || amount <= 0.0 {
    return Err(AppError::validation("amount must be greater than 0"));
  }
  Ok(())
}

fn normalize_currency(currency: Option<String>) -> AppResult<String> {
  let currency = currency
    .map(|c| c.trim().to_ascii_uppercase())
    .filter(|c| !c.is_empty())
    .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

  if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
    return Err(AppError::validation("currency must be a 3-letter code"));
  }
  Ok(currency)
}

/// `paid_at` after a status change
fn next_paid_at(
  current: Option<DateTime<Utc>>,
  status: BillingStatus,
  now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
  match status {
    BillingStatus::Paid => current.or(Some(now)),
    _ => None,
  }
}

/// ---------------------------------------------------------------------------
/// Database Operations
/// ---------------------------------------------------------------------------

pub async fn create_billing(pool: &SqlitePool, new_billing: NewBilling) -> AppResult<Billing> {
  let coach_id = new_billing
    .coach_id
    .ok_or_else(|| AppError::validation("coachId is required"))?;
  let athlete_id = new_billing
    .athlete_id
    .ok_or_else(|| AppError::validation("athleteId is required"))?;
  let amount = new_billing
    .amount
    .ok_or_else(|| AppError::validation("amount is required"))?;
  validate_amount(amount)?;
  let due_date = new_billing
    .due_date
    .ok_or_else(|| AppError::validation("dueDate is required"))?;
  let currency = normalize_currency(new_billing.currency)?;

  let owner: Uuid = sqlx::query_scalar("SELECT coach_id FROM athletes WHERE id = ?")
    .bind(athlete_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Athlete {}", athlete_id)))?;
  if owner != coach_id {
    return Err(AppError::validation("athlete does not belong to this coach"));
  }

  let billing: Billing = sqlx::query_as(
    r#"
    INSERT INTO billing (id, coach_id, athlete_id, amount, currency, description, due_date, status, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    RETURNING *
    "#,
  )
  .bind(Uuid::new_v4())
  .bind(coach_id)
  .bind(athlete_id)
  .bind(amount)
  .bind(currency)
  .bind(new_billing.description)
  .bind(due_date)
  .bind(BillingStatus::Pending)
  .bind(Utc::now())
  .fetch_one(pool)
  .await?;

  info!(billing_id = %billing.id, %coach_id, %athlete_id, amount, "Created billing record");
  Ok(billing)
}

/// List by coach and/or athlete, soonest due first
pub async fn list_billing(
  pool: &SqlitePool,
  coach_id: Option<Uuid>,
  athlete_id: Option<Uuid>,
) -> AppResult<Vec<Billing>> {
  let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM billing WHERE 1 = 1");
  if let Some(coach_id) = coach_id {
    builder.push(" AND coach_id = ").push_bind(coach_id);
  }
  if let Some(athlete_id) = athlete_id {
    builder.push(" AND athlete_id = ").push_bind(athlete_id);
  }
  builder.push(" ORDER BY due_date, created_at");

  let records = builder.build_query_as::<Billing>().fetch_all(pool).await?;
  Ok(records)
}

pub async fn get_billing(pool: &SqlitePool, billing_id: Uuid) -> AppResult<Billing> {
  sqlx::query_as::<_, Billing>("SELECT * FROM billing WHERE id = ?")
    .bind(billing_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Billing record {}", billing_id)))
}

/// Apply a partial update; absent fields keep their stored value
pub async fn update_billing(pool: &SqlitePool, billing_id: Uuid, update: BillingUpdate) -> AppResult<Billing> {
  if let Some(amount) = update.amount {
    validate_amount(amount)?;
  }

  let mut tx = pool.begin().await?;

  let current = sqlx::query_as::<_, Billing>("SELECT * FROM billing WHERE id = ?")
    .bind(billing_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Billing record {}", billing_id)))?;

  let status = update.status.unwrap_or(current.status);
  let paid_at = match update.status {
    Some(status) => next_paid_at(current.paid_at, status, Utc::now()),
    None => current.paid_at,
  };

  let billing: Billing = sqlx::query_as(
    r#"
    UPDATE billing
    SET amount = ?, description = ?, due_date = ?, status = ?, paid_at = ?
    WHERE id = ?
    RETURNING *
    "#,
  )
  .bind(update.amount.unwrap_or(current.amount))
  .bind(match update.description {
    Some(description) => description,
    None => current.description,
  })
  .bind(update.due_date.unwrap_or(current.due_date))
  .bind(status)
  .bind(paid_at)
  .bind(billing_id)
  .fetch_one(&mut *tx)
  .await?;

  tx.commit().await?;

  if current.status != billing.status {
    info!(%billing_id, from = ?current.status, to = ?billing.status, "Billing status changed");
  }
  Ok(billing)
}

pub async fn delete_billing(pool: &SqlitePool, billing_id: Uuid) -> AppResult<()> {
  let result = sqlx::query("DELETE FROM billing WHERE id = ?")
    .bind(billing_id)
    .execute(pool)
    .await?;

  if result.rows_affected() == 0 {
    return Err(AppError::not_found(format!("Billing record {}", billing_id)));
  }
  Ok(())
}
