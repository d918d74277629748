use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coach {
  pub id: Uuid,
  pub name: String,
  pub email: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Athlete {
  pub id: Uuid,
  pub coach_id: Uuid,
  pub name: String,
  pub email: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// A movement in the catalog (squat, bench press, ...)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  pub id: Uuid,
  pub name: String,
  pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
  pub coach_id: Option<Uuid>,
  pub name: Option<String>,
  pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExercise {
  pub name: Option<String>,
  pub category: Option<String>,
}
