use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::AppState;
use crate::error::{AppError, AppResult};
use crate::reporting::{self, PerformanceReport, Period};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerformanceQuery {
  athlete_id: Option<Uuid>,
  exercise_id: Option<Uuid>,
  period: Option<String>,
}

pub struct PerformanceRoutes;

impl PerformanceRoutes {
  pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
      .route("/api/performance", get(Self::handle_report))
      .with_state(state)
  }

  /// Recomputed from the logged sets on every request
  async fn handle_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PerformanceQuery>,
  ) -> AppResult<Json<PerformanceReport>> {
    let athlete_id = query
      .athlete_id
      .ok_or_else(|| AppError::validation("athleteId is required"))?;
    let period = match query.period.as_deref() {
      Some(raw) => raw.parse::<Period>()?,
      None => Period::default(),
    };

    let report =
      reporting::build_performance_report(&state.db, athlete_id, query.exercise_id, period, Utc::now()).await?;
    Ok(Json(report))
  }
}
