use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{NewRecoveryCheckin, RecoveryCheckin};
use crate::recovery;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckinQuery {
  athlete_id: Option<Uuid>,
  from: Option<NaiveDate>,
  to: Option<NaiveDate>,
}

/// TRAC recovery check-ins
pub struct RecoveryRoutes;

impl RecoveryRoutes {
  pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
      .route("/api/recovery", get(Self::handle_list).post(Self::handle_record))
      .with_state(state)
  }

  async fn handle_record(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewRecoveryCheckin>,
  ) -> AppResult<(StatusCode, Json<RecoveryCheckin>)> {
    let checkin = recovery::record_checkin(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(checkin)))
  }

  async fn handle_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckinQuery>,
  ) -> AppResult<Json<Vec<RecoveryCheckin>>> {
    let athlete_id = query
      .athlete_id
      .ok_or_else(|| AppError::validation("athleteId is required"))?;
    let checkins = recovery::list_checkins(&state.db, athlete_id, query.from, query.to).await?;
    Ok(Json(checkins))
  }
}

#[cfg(test)]
mod tests {
  use crate::test_utils::{seed_test_roster, send_json, setup_test_db, teardown_test_db, test_app};
  use axum::http::{Method, StatusCode};
  use serde_json::json;

  #[tokio::test]
  async fn test_checkin_and_list() {
    let pool = setup_test_db().await;
    let roster = seed_test_roster(&pool).await;
    let app = test_app(&pool);

    let (status, checkin) = send_json(
      &app,
      Method::POST,
      "/api/recovery",
      Some(json!({
        "athleteId": roster.athlete_id,
        "checkinDate": "2024-05-01",
        "sleep": 10,
        "soreness": 0,
        "motivation": 10
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(checkin["tracScore"], 20);

    let (status, list) = send_json(
      &app,
      Method::GET,
      &format!("/api/recovery?athleteId={}&from=2024-04-01&to=2024-05-31", roster.athlete_id),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = send_json(&app, Method::GET, "/api/recovery", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    teardown_test_db(pool).await;
  }
}
