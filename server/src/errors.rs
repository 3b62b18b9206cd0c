// ormlab/server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use ormlab::LabError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Lab Error: {source}")]
  Lab {
    #[source]
    source: LabError,
  },
}

// Lab failures keep their meaning at the HTTP boundary: a missing entity is a
// 404, storage errors are database errors, everything else stays a lab error.
impl From<LabError> for AppError {
  fn from(err: LabError) -> Self {
    match err {
      LabError::NotFound { .. } => AppError::NotFound(err.to_string()),
      LabError::Storage(e) => AppError::Sqlx(e),
      other => AppError::Lab { source: other },
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Lab { source } => {
        tracing::error!(lab_error_source = ?source, "Lab error details");
        HttpResponse::InternalServerError().json(json!({"error": "Lab operation failed", "detail": source.to_string()}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
