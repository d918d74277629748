//! Training blocks and their plan tree
//!
//! Every handler that writes under a block drops that block's cached plan
//! before responding.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::AppState;
use crate::duplication::{self, DuplicationSummary};
use crate::error::AppResult;
use crate::models::{
  BlockPlan, BlockStatus, ExerciseSetUpdate, NewDayExercise, NewTrainingBlock, NewTrainingDay,
  PlannedExercise, TrainingBlock, TrainingDay,
};
use crate::plan;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockQuery {
  coach_id: Option<Uuid>,
  athlete_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
  status: BlockStatus,
}

#[derive(Debug, Serialize)]
struct DuplicatedWeek {
  summary: DuplicationSummary,
  plan: BlockPlan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdated {
  updated: usize,
  block_ids: Vec<Uuid>,
}

pub struct BlockRoutes;

impl BlockRoutes {
  pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
      .route("/api/blocks", get(Self::handle_list).post(Self::handle_create))
      .route("/api/blocks/:id", get(Self::handle_get_plan).delete(Self::handle_delete))
      .route("/api/blocks/:id/status", patch(Self::handle_update_status))
      .route("/api/blocks/:id/days", post(Self::handle_add_day))
      .route("/api/blocks/:id/duplicate-week", post(Self::handle_duplicate_week))
      .route("/api/days/:id/exercises", post(Self::handle_add_exercise))
      .route("/api/day-exercises/:id", delete(Self::handle_delete_exercise))
      .route("/api/exercise-sets/bulk", put(Self::handle_bulk_update_sets))
      .with_state(state)
  }

  async fn handle_create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewTrainingBlock>,
  ) -> AppResult<(StatusCode, Json<TrainingBlock>)> {
    let block = plan::create_block(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(block)))
  }

  async fn handle_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BlockQuery>,
  ) -> AppResult<Json<Vec<TrainingBlock>>> {
    let blocks = plan::list_blocks(&state.db, query.coach_id, query.athlete_id).await?;
    Ok(Json(blocks))
  }

  async fn handle_get_plan(
    State(state): State<Arc<AppState>>,
    Path(block_id): Path<Uuid>,
  ) -> AppResult<Json<BlockPlan>> {
    let plan = plan::get_block_plan_cached(&state.db, &state.plans, block_id).await?;
    Ok(Json(plan))
  }

  async fn handle_delete(State(state): State<Arc<AppState>>, Path(block_id): Path<Uuid>) -> AppResult<StatusCode> {
    plan::delete_block(&state.db, block_id).await?;
    state.plans.invalidate(&block_id);
    Ok(StatusCode::NO_CONTENT)
  }

  async fn handle_update_status(
    State(state): State<Arc<AppState>>,
    Path(block_id): Path<Uuid>,
    Json(body): Json<StatusBody>,
  ) -> AppResult<Json<TrainingBlock>> {
    let block = plan::update_block_status(&state.db, block_id, body.status).await?;
    state.plans.invalidate(&block_id);
    Ok(Json(block))
  }

  async fn handle_add_day(
    State(state): State<Arc<AppState>>,
    Path(block_id): Path<Uuid>,
    Json(body): Json<NewTrainingDay>,
  ) -> AppResult<(StatusCode, Json<TrainingDay>)> {
    let day = plan::add_day(&state.db, block_id, body).await?;
    state.plans.invalidate(&block_id);
    Ok((StatusCode::CREATED, Json(day)))
  }

  /// Copy the block's latest week forward and return the reloaded plan
  async fn handle_duplicate_week(
    State(state): State<Arc<AppState>>,
    Path(block_id): Path<Uuid>,
  ) -> AppResult<(StatusCode, Json<DuplicatedWeek>)> {
    let summary = duplication::duplicate_latest_week(&state.db, block_id).await?;
    state.plans.invalidate(&block_id);

    let plan = plan::get_block_plan_cached(&state.db, &state.plans, block_id).await?;
    info!(%block_id, new_week = summary.new_week, "Week duplicated");
    Ok((StatusCode::CREATED, Json(DuplicatedWeek { summary, plan })))
  }

  async fn handle_add_exercise(
    State(state): State<Arc<AppState>>,
    Path(day_id): Path<Uuid>,
    Json(body): Json<NewDayExercise>,
  ) -> AppResult<(StatusCode, Json<PlannedExercise>)> {
    let (block_id, exercise) = plan::add_day_exercise(&state.db, day_id, body).await?;
    state.plans.invalidate(&block_id);
    Ok((StatusCode::CREATED, Json(exercise)))
  }

  async fn handle_delete_exercise(
    State(state): State<Arc<AppState>>,
    Path(day_exercise_id): Path<Uuid>,
  ) -> AppResult<StatusCode> {
    let block_id = plan::delete_day_exercise(&state.db, day_exercise_id).await?;
    state.plans.invalidate(&block_id);
    Ok(StatusCode::NO_CONTENT)
  }

  async fn handle_bulk_update_sets(
    State(state): State<Arc<AppState>>,
    Json(updates): Json<Vec<ExerciseSetUpdate>>,
  ) -> AppResult<Json<BulkUpdated>> {
    let block_ids = plan::update_exercise_sets_bulk(&state.db, &updates).await?;
    for block_id in &block_ids {
      state.plans.invalidate(block_id);
    }
    Ok(Json(BulkUpdated {
      updated: updates.len(),
      block_ids,
    }))
  }
}
