//! HTTP surface
//!
//! Each resource group builds its own `Router` with the shared state already
//! applied; `router` merges them and adds request tracing.

mod billing;
mod blocks;
mod logs;
mod performance;
mod recovery;
mod roster;
mod subscriptions;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::db::AppState;

pub use billing::BillingRoutes;
pub use blocks::BlockRoutes;
pub use logs::LogRoutes;
pub use performance::PerformanceRoutes;
pub use recovery::RecoveryRoutes;
pub use roster::RosterRoutes;
pub use subscriptions::SubscriptionRoutes;

async fn health() -> Json<Value> {
  Json(json!({ "status": "healthy" }))
}

/// Build the full application router
pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(health))
    .merge(RosterRoutes::routes(state.clone()))
    .merge(BlockRoutes::routes(state.clone()))
    .merge(LogRoutes::routes(state.clone()))
    .merge(PerformanceRoutes::routes(state.clone()))
    .merge(BillingRoutes::routes(state.clone()))
    .merge(SubscriptionRoutes::routes(state.clone()))
    .merge(RecoveryRoutes::routes(state))
    .layer(TraceLayer::new_for_http())
}
