use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::AppState;
use crate::error::AppResult;
use crate::models::{Athlete, Coach, Exercise, NewExercise, NewPerson};
use crate::roster;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AthleteQuery {
  coach_id: Option<Uuid>,
}

/// Coaches, athletes and the exercise catalog
pub struct RosterRoutes;

impl RosterRoutes {
  pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
      .route("/api/coaches", get(Self::handle_list_coaches).post(Self::handle_create_coach))
      .route("/api/athletes", get(Self::handle_list_athletes).post(Self::handle_create_athlete))
      .route("/api/exercises", get(Self::handle_list_exercises).post(Self::handle_create_exercise))
      .with_state(state)
  }

  async fn handle_create_coach(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewPerson>,
  ) -> AppResult<(StatusCode, Json<Coach>)> {
    let coach = roster::create_coach(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(coach)))
  }

  async fn handle_list_coaches(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Coach>>> {
    Ok(Json(roster::list_coaches(&state.db).await?))
  }

  async fn handle_create_athlete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewPerson>,
  ) -> AppResult<(StatusCode, Json<Athlete>)> {
    let athlete = roster::create_athlete(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(athlete)))
  }

  async fn handle_list_athletes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AthleteQuery>,
  ) -> AppResult<Json<Vec<Athlete>>> {
    Ok(Json(roster::list_athletes(&state.db, query.coach_id).await?))
  }

  async fn handle_create_exercise(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewExercise>,
  ) -> AppResult<(StatusCode, Json<Exercise>)> {
    let exercise = roster::create_exercise(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(exercise)))
  }

  async fn handle_list_exercises(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Exercise>>> {
    Ok(Json(roster::list_exercises(&state.db).await?))
  }
}
