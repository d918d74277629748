use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use crate::cache::PlanCache;
use crate::config::ServerConfig;

pub type DbPool = SqlitePool;

/// Application state shared by every request handler
pub struct AppState {
  pub db: DbPool,
  pub plans: PlanCache,
}

impl AppState {
  pub fn new(db: DbPool) -> Self {
    Self {
      db,
      plans: PlanCache::new(),
    }
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(config: &ServerConfig) -> Result<DbPool, Box<dyn std::error::Error>> {
  info!(url = %config.database_url, "Initializing database");

  let options = SqliteConnectOptions::from_str(&config.database_url)?
    .create_if_missing(true)
    .foreign_keys(true);

  // Create connection pool
  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect_with(options)
    .await?;

  // Run migrations
  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}
