// ormlab/core/src/db/mod.rs

//! Pool construction and schema management for the lab database.

pub(crate) mod rows;

use crate::error::LabResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, instrument};

const SCHEMA: &str = include_str!("schema.sql");

#[derive(Debug, Clone)]
pub struct DbSettings {
  pub url: String,
  pub max_connections: u32,
}

impl Default for DbSettings {
  fn default() -> Self {
    Self {
      url: "sqlite::memory:".to_string(),
      max_connections: 5,
    }
  }
}

impl DbSettings {
  pub fn in_memory() -> Self {
    Self::default()
  }

  pub fn is_in_memory(&self) -> bool {
    self.url.contains(":memory:") || self.url.contains("mode=memory")
  }
}

/// Opens a pool with foreign keys enforced on every connection.
///
/// Every connection to `sqlite::memory:` is a separate database, so in-memory
/// pools are pinned to a single connection that is never recycled.
#[instrument(name = "db::connect", skip_all, fields(url = %settings.url))]
pub async fn connect(settings: &DbSettings) -> LabResult<SqlitePool> {
  let options = SqliteConnectOptions::from_str(&settings.url)?
    .create_if_missing(true)
    .foreign_keys(true);

  let pool = if settings.is_in_memory() {
    SqlitePoolOptions::new()
      .max_connections(1)
      .min_connections(1)
      .idle_timeout(None)
      .max_lifetime(None)
      .connect_with(options)
      .await?
  } else {
    SqlitePoolOptions::new()
      .max_connections(settings.max_connections.max(1))
      .connect_with(options)
      .await?
  };

  info!(in_memory = settings.is_in_memory(), "Database pool ready.");
  Ok(pool)
}

/// Drops and recreates all lab tables.
#[instrument(name = "db::reset_schema", skip_all)]
pub async fn reset_schema(pool: &SqlitePool) -> LabResult<()> {
  sqlx::raw_sql(SCHEMA).execute(pool).await?;
  info!("Schema recreated.");
  Ok(())
}
