// ormlab/core/src/session/tracking.rs

//! Dirty checking. Every entity managed by a read-write session is paired
//! with a snapshot of its persistent columns; flushing compares the two and
//! writes only what changed.

use crate::error::LabResult;
use crate::session::Managed;
use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::fmt;
use tracing::debug;

/// A mapped entity whose persistent state can be compared and written back.
#[async_trait]
pub trait Entity: Clone + Send + Sync + 'static {
  const NAME: &'static str;

  /// The columns compared by dirty checking. Associations are not part of it.
  type State: PartialEq + Clone + fmt::Debug + Send + Sync + 'static;

  fn id(&self) -> i64;

  fn state(&self) -> Self::State;

  /// Issues the UPDATE for the current state.
  async fn write_state(&self, conn: &mut SqliteConnection) -> LabResult<()>;
}

/// Type-erased tracking entry, so one session can track every entity kind.
#[async_trait]
pub(crate) trait DirtyEntry: Send + Sync {
  fn describe(&self) -> String;

  fn is_dirty(&self) -> bool;

  /// Writes the entity if it changed since the last snapshot. Returns whether
  /// a statement was issued.
  async fn flush(&mut self, conn: &mut SqliteConnection) -> LabResult<bool>;
}

pub(crate) struct Tracked<E: Entity> {
  handle: Managed<E>,
  snapshot: E::State,
}

impl<E: Entity> Tracked<E> {
  pub(crate) fn new(handle: Managed<E>) -> Self {
    let snapshot = handle.read().state();
    Self { handle, snapshot }
  }
}

#[async_trait]
impl<E: Entity> DirtyEntry for Tracked<E> {
  fn describe(&self) -> String {
    format!("{}#{}", E::NAME, self.handle.read().id())
  }

  fn is_dirty(&self) -> bool {
    self.handle.read().state() != self.snapshot
  }

  async fn flush(&mut self, conn: &mut SqliteConnection) -> LabResult<bool> {
    let current = self.handle.snapshot();
    let state = current.state();
    if state == self.snapshot {
      return Ok(false);
    }
    debug!(entity = E::NAME, id = current.id(), from = ?self.snapshot, to = ?state, "Flushing dirty entity.");
    current.write_state(conn).await?;
    self.snapshot = state;
    Ok(true)
  }
}
