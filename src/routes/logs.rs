use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::AppState;
use crate::error::AppResult;
use crate::models::{ExerciseLog, NewExerciseLog};
use crate::training_log;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogQuery {
  athlete_id: Option<Uuid>,
  day_exercise_id: Option<Uuid>,
}

/// Performed sets
pub struct LogRoutes;

impl LogRoutes {
  pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
      .route("/api/logs", get(Self::handle_list).post(Self::handle_record))
      .route("/api/logs/:id", delete(Self::handle_delete))
      .with_state(state)
  }

  async fn handle_record(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewExerciseLog>,
  ) -> AppResult<(StatusCode, Json<ExerciseLog>)> {
    let log = training_log::record_log(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(log)))
  }

  async fn handle_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
  ) -> AppResult<Json<Vec<ExerciseLog>>> {
    let logs = training_log::list_logs(&state.db, query.athlete_id, query.day_exercise_id).await?;
    Ok(Json(logs))
  }

  async fn handle_delete(State(state): State<Arc<AppState>>, Path(log_id): Path<Uuid>) -> AppResult<StatusCode> {
    training_log::delete_log(&state.db, log_id).await?;
    Ok(StatusCode::NO_CONTENT)
  }
}
