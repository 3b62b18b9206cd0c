// ormlab/server/src/main.rs

// Declare modules for the application
mod config;
mod errors;
mod state;
mod web;

use crate::config::AppConfig;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer}; // Renamed web to actix_data
use anyhow::Context;
use chrono::Utc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  // RUST_LOG overrides the default level
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .init();

  tracing::info!("Starting ORM lab server...");

  let app_config = AppConfig::from_env().context("Failed to load application configuration")?;

  let db_settings = app_config.db_settings();
  let db_pool = ormlab::connect(&db_settings)
    .await
    .with_context(|| format!("Failed to connect to the database at {}", db_settings.url))?;
  tracing::info!(url = %db_settings.url, "Successfully connected to the database.");

  // An in-memory database starts without tables, so it always gets a schema.
  if app_config.seed_db || db_settings.is_in_memory() {
    ormlab::reset_schema(&db_pool).await.context("Failed to create the schema")?;
  }
  if app_config.seed_db {
    let summary = ormlab::seed_database(&db_pool, &app_config.seed_config(), Utc::now())
      .await
      .context("Failed to seed the database")?;
    tracing::info!(?summary, "Database seeded.");
  } else {
    tracing::info!("Database seeding disabled.");
  }

  let app_state = AppState::new(db_pool, &app_config);

  let server_address = app_config.server_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await?;

  Ok(())
}
