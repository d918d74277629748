use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::billing;
use crate::db::AppState;
use crate::error::AppResult;
use crate::models::{Billing, BillingUpdate, NewBilling};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BillingQuery {
  coach_id: Option<Uuid>,
  athlete_id: Option<Uuid>,
}

/// Coach -> athlete invoices
pub struct BillingRoutes;

impl BillingRoutes {
  pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
      .route("/api/billing", get(Self::handle_list).post(Self::handle_create))
      .route(
        "/api/billing/:id",
        get(Self::handle_get).put(Self::handle_update).delete(Self::handle_delete),
      )
      .with_state(state)
  }

  async fn handle_create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewBilling>,
  ) -> AppResult<(StatusCode, Json<Billing>)> {
    let record = billing::create_billing(&state.db, body).await?;
    Ok((StatusCode::CREATED, Json(record)))
  }

  async fn handle_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BillingQuery>,
  ) -> AppResult<Json<Vec<Billing>>> {
    let records = billing::list_billing(&state.db, query.coach_id, query.athlete_id).await?;
    Ok(Json(records))
  }

  async fn handle_get(State(state): State<Arc<AppState>>, Path(billing_id): Path<Uuid>) -> AppResult<Json<Billing>> {
    Ok(Json(billing::get_billing(&state.db, billing_id).await?))
  }

  async fn handle_update(
    State(state): State<Arc<AppState>>,
    Path(billing_id): Path<Uuid>,
    Json(body): Json<BillingUpdate>,
  ) -> AppResult<Json<Billing>> {
    Ok(Json(billing::update_billing(&state.db, billing_id, body).await?))
  }

  async fn handle_delete(State(state): State<Arc<AppState>>, Path(billing_id): Path<Uuid>) -> AppResult<StatusCode> {
    billing::delete_billing(&state.db, billing_id).await?;
    Ok(StatusCode::NO_CONTENT)
  }
}
