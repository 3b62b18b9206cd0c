// ormlab/server/src/state.rs
use crate::config::AppConfig;
use ormlab::LabService;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: SqlitePool,
  pub lab: Arc<LabService>,
}

impl AppState {
  pub fn new(db_pool: SqlitePool, config: &AppConfig) -> Self {
    let lab = Arc::new(LabService::new(db_pool.clone(), config.lab));
    Self { db_pool, lab }
  }
}
