mod billing;
mod cache;
mod config;
mod db;
mod duplication;
mod error;
mod logging;
mod metrics;
mod models;
mod payments;
mod plan;
mod recovery;
mod reporting;
mod roster;
mod routes;
mod subscriptions;
mod training_log;

#[cfg(test)]
mod test_utils;

use std::error::Error;
use std::sync::Arc;

use config::ServerConfig;
use db::AppState;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub async fn run() -> Result<(), Box<dyn Error>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  logging::init();

  let config = ServerConfig::from_env()?;
  let pool = db::initialize_db(&config).await?;
  let state = Arc::new(AppState::new(pool));
  let app = routes::router(state);

  let listener = TcpListener::bind(config.bind_addr).await?;
  info!(addr = %config.bind_addr, "powerlog listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "Failed to listen for shutdown signal");
  }
}
