// ormlab/core/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
  /// A deferred association was resolved after its session closed.
  #[error("failed to lazily initialize {association} of #{owner}: no open session (entity is detached)")]
  DetachedAccess { association: String, owner: i64 },

  #[error("association {association} is not loaded")]
  Uninitialized { association: String },

  #[error("session is closed")]
  SessionClosed,

  #[error("{entity} #{id} not found")]
  NotFound { entity: &'static str, id: i64 },

  #[error("invalid seed configuration: {0}")]
  InvalidSeedConfig(String),

  #[error("could not decode stored value: {0}")]
  Decode(String),

  #[error("storage error: {0}")]
  Storage(#[from] sqlx::Error),
}

impl LabError {
  pub fn is_detached_access(&self) -> bool {
    matches!(self, LabError::DetachedAccess { .. })
  }
}

impl From<rust_decimal::Error> for LabError {
  fn from(err: rust_decimal::Error) -> Self {
    LabError::Decode(err.to_string())
  }
}

pub type LabResult<T, E = LabError> = std::result::Result<T, E>;
