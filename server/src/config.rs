// ormlab/server/src/config.rs

use crate::errors::{AppError, Result}; // Use AppError specific Result
use dotenvy::dotenv;
use ormlab::{DbSettings, LabSettings, SeedConfig};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)] // Clone is useful if parts of config are passed around
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub db_max_connections: u32,

  // Recreate the schema and load sample data on startup
  pub seed_db: bool,
  pub seed_value: u64,

  pub lab: LabSettings,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; unset variables fall back
  /// to their defaults, unparseable ones are errors.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get_or = |var_name: &str, default: &str| lookup(var_name).unwrap_or_else(|| default.to_string());

    let server_host = get_or("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var::<u16>("SERVER_PORT", &get_or("SERVER_PORT", "8080"))?;
    let database_url = get_or("DATABASE_URL", "sqlite::memory:");
    let db_max_connections = parse_var::<u32>("DB_MAX_CONNECTIONS", &get_or("DB_MAX_CONNECTIONS", "5"))?;

    let seed_db = parse_var::<bool>("SEED_DB", &get_or("SEED_DB", "true"))?;
    let seed_value = parse_var::<u64>("SEED_VALUE", &get_or("SEED_VALUE", "42"))?;

    let defaults = LabSettings::default();
    let lab = LabSettings {
      demo_order_id: parse_var("LAB_DEMO_ORDER_ID", &get_or("LAB_DEMO_ORDER_ID", &defaults.demo_order_id.to_string()))?,
      projection_limit: parse_var(
        "LAB_PROJECTION_LIMIT",
        &get_or("LAB_PROJECTION_LIMIT", &defaults.projection_limit.to_string()),
      )?,
      join_preview_limit: parse_var(
        "LAB_JOIN_PREVIEW_LIMIT",
        &get_or("LAB_JOIN_PREVIEW_LIMIT", &defaults.join_preview_limit.to_string()),
      )?,
    };
    if lab.projection_limit == 0 {
      return Err(AppError::Config("LAB_PROJECTION_LIMIT must be positive".to_string()));
    }

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      db_max_connections,
      seed_db,
      seed_value,
      lab,
    })
  }

  pub fn db_settings(&self) -> DbSettings {
    DbSettings {
      url: self.database_url.clone(),
      max_connections: self.db_max_connections,
    }
  }

  pub fn seed_config(&self) -> SeedConfig {
    SeedConfig::with_seed(self.seed_value)
  }

  pub fn server_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_var<T>(var_name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e)))
}
