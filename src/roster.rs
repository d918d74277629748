//! Coaches, athletes and the movement catalog

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Athlete, Coach, Exercise, NewExercise, NewPerson};

pub const DEFAULT_CATEGORY: &str = "accessory";

fn required_name(name: Option<String>) -> AppResult<String> {
  name
    .map(|n| n.trim().to_string())
    .filter(|n| !n.is_empty())
    .ok_or_else(|| AppError::validation("name is required"))
}

fn clean_email(email: Option<String>) -> AppResult<Option<String>> {
  match email.map(|e| e.trim().to_ascii_lowercase()).filter(|e| !e.is_empty()) {
    Some(email) if !email.contains('@') => Err(AppError::validation("email is not valid")),
    other => Ok(other),
  }
}

pub async fn create_coach(pool: &SqlitePool, person: NewPerson) -> AppResult<Coach> {
  let name = required_name(person.name)?;
  let email = clean_email(person.email)?;

  let coach: Coach = sqlx::query_as("INSERT INTO coaches (id, name, email) VALUES (?, ?, ?) RETURNING *")
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await?;

  info!(coach_id = %coach.id, "Created coach");
  Ok(coach)
}

pub async fn list_coaches(pool: &SqlitePool) -> AppResult<Vec<Coach>> {
  let coaches = sqlx::query_as::<_, Coach>("SELECT * FROM coaches ORDER BY name")
    .fetch_all(pool)
    .await?;
  Ok(coaches)
}

pub async fn create_athlete(pool: &SqlitePool, person: NewPerson) -> AppResult<Athlete> {
  let coach_id = person
    .coach_id
    .ok_or_else(|| AppError::validation("coachId is required"))?;
  let name = required_name(person.name)?;
  let email = clean_email(person.email)?;

  let athlete: Athlete = sqlx::query_as(
    "INSERT INTO athletes (id, coach_id, name, email) VALUES (?, ?, ?, ?) RETURNING *",
  )
  .bind(Uuid::new_v4())
  .bind(coach_id)
  .bind(name)
  .bind(email)
  .fetch_one(pool)
  .await?;

  info!(athlete_id = %athlete.id, %coach_id, "Created athlete");
  Ok(athlete)
}

pub async fn list_athletes(pool: &SqlitePool, coach_id: Option<Uuid>) -> AppResult<Vec<Athlete>> {
  let athletes = match coach_id {
    Some(coach_id) => {
      sqlx::query_as::<_, Athlete>("SELECT * FROM athletes WHERE coach_id = ? ORDER BY name")
        .bind(coach_id)
        .fetch_all(pool)
        .await?
    }
    None => {
      sqlx::query_as::<_, Athlete>("SELECT * FROM athletes ORDER BY name")
        .fetch_all(pool)
        .await?
    }
  };
  Ok(athletes)
}

pub async fn create_exercise(pool: &SqlitePool, exercise: NewExercise) -> AppResult<Exercise> {
  let name = required_name(exercise.name)?;
  let category = exercise
    .category
    .map(|c| c.trim().to_ascii_lowercase())
    .filter(|c| !c.is_empty())
    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

  let created: Exercise = sqlx::query_as("INSERT INTO exercises (id, name, category) VALUES (?, ?, ?) RETURNING *")
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(category)
    .fetch_one(pool)
    .await?;

  Ok(created)
}

pub async fn list_exercises(pool: &SqlitePool) -> AppResult<Vec<Exercise>> {
  let exercises = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises ORDER BY category, name")
    .fetch_all(pool)
    .await?;
  Ok(exercises)
}
