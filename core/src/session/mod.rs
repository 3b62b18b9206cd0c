// ormlab/core/src/session/mod.rs

//! The unit of work.
//!
//! A `Session` wraps one database transaction and owns everything that only
//! makes sense while that transaction is open:
//!  - a statement counter (every query goes through the session),
//!  - an identity map handing out one `Managed<T>` per entity,
//!  - dirty tracking, flushed on commit in read-write mode,
//!  - weak links that let deferred associations load through it.
//!
//! Once committed, rolled back or dropped, the session is closed and every
//! deferred association it produced becomes detached.

mod graph;
mod identity;
mod lazy;
mod managed;
mod queries;
mod tracking;

pub use managed::Managed;
pub use queries::FetchedGraph;
pub use tracking::Entity;

use crate::error::{LabError, LabResult};
use crate::model::DeferredLink;
use identity::{Cached, IdentityMap};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{MappedMutexGuard, Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, instrument, warn};
use tracking::{DirtyEntry, Tracked};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
  ReadWrite,
  /// Nothing is tracked and nothing is flushed; in-memory edits are discarded.
  ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
  pub statements: usize,
  pub flushed: usize,
}

/// A value together with the number of statements it took to produce.
#[derive(Debug, Clone)]
pub struct Measured<T> {
  pub value: T,
  pub statements: usize,
}

impl<T> Measured<T> {
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Measured<U> {
    Measured {
      value: f(self.value),
      statements: self.statements,
    }
  }
}

/// Work executed inside `run_in_session`.
pub type SessionFuture<T> = Pin<Box<dyn Future<Output = LabResult<T>> + Send>>;

pub(crate) struct SessionInner {
  id: u64,
  mode: SessionMode,
  open: AtomicBool,
  // Held across .await while a statement runs, hence the async mutex.
  tx: AsyncMutex<Option<Transaction<'static, Sqlite>>>,
  statements: AtomicUsize,
  identity: parking_lot::Mutex<IdentityMap>,
  tracked: parking_lot::Mutex<Vec<Box<dyn DirtyEntry>>>,
}

impl SessionInner {
  pub(crate) fn is_open(&self) -> bool {
    self.open.load(Ordering::Acquire)
  }
}

impl Drop for SessionInner {
  fn drop(&mut self) {
    if self.is_open() {
      // The transaction rolls itself back when dropped.
      debug!(session_id = self.id, "Session dropped while open; transaction rolled back.");
    }
  }
}

#[derive(Clone)]
pub struct Session {
  inner: Arc<SessionInner>,
}

impl Session {
  #[instrument(name = "Session::begin", skip(pool))]
  pub async fn begin(pool: &SqlitePool, mode: SessionMode) -> LabResult<Self> {
    let tx = pool.begin().await?;
    let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
    debug!(session_id = id, ?mode, "Session opened.");
    Ok(Self {
      inner: Arc::new(SessionInner {
        id,
        mode,
        open: AtomicBool::new(true),
        tx: AsyncMutex::new(Some(tx)),
        statements: AtomicUsize::new(0),
        identity: parking_lot::Mutex::new(IdentityMap::default()),
        tracked: parking_lot::Mutex::new(Vec::new()),
      }),
    })
  }

  pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
    Self { inner }
  }

  pub fn id(&self) -> u64 {
    self.inner.id
  }

  pub fn mode(&self) -> SessionMode {
    self.inner.mode
  }

  pub fn is_open(&self) -> bool {
    self.inner.is_open()
  }

  pub fn statement_count(&self) -> usize {
    self.inner.statements.load(Ordering::Acquire)
  }

  /// Number of entities currently held by the identity map.
  pub fn managed_count(&self) -> usize {
    self.inner.identity.lock().len()
  }

  /// True if any tracked entity differs from its snapshot.
  pub fn is_dirty(&self) -> bool {
    self.inner.tracked.lock().iter().any(|entry| entry.is_dirty())
  }

  /// Writes every dirty tracked entity. Returns how many were written.
  #[instrument(name = "Session::flush", skip(self), fields(session_id = self.inner.id))]
  pub async fn flush(&self) -> LabResult<usize> {
    if self.inner.mode == SessionMode::ReadOnly {
      debug!("Read-only session; flush skipped.");
      return Ok(0);
    }

    let mut entries = std::mem::take(&mut *self.inner.tracked.lock());
    let result: LabResult<usize> = async {
      let mut conn = self.conn().await?;
      let mut written = 0;
      for entry in entries.iter_mut() {
        if entry.flush(&mut *conn).await? {
          self.record(&format!("UPDATE {}", entry.describe()));
          written += 1;
        }
      }
      Ok(written)
    }
    .await;

    // Entities managed while flushing were pushed onto the emptied list.
    {
      let mut tracked = self.inner.tracked.lock();
      let newer = std::mem::take(&mut *tracked);
      *tracked = entries;
      tracked.extend(newer);
    }
    result
  }

  /// Flushes (read-write only) and commits. The session is closed afterwards.
  #[instrument(name = "Session::commit", skip(self), fields(session_id = self.inner.id))]
  pub async fn commit(self) -> LabResult<SessionStats> {
    let flushed = match self.flush().await {
      Ok(flushed) => flushed,
      Err(err) => {
        warn!(error = %err, "Flush failed; rolling back.");
        if let Err(rollback_err) = self.release(false).await {
          warn!(error = %rollback_err, "Rollback after failed flush also failed.");
        }
        return Err(err);
      }
    };
    self.release(true).await?;
    let stats = SessionStats {
      statements: self.statement_count(),
      flushed,
    };
    debug!(statements = stats.statements, flushed = stats.flushed, "Session committed.");
    Ok(stats)
  }

  /// Discards all changes. The session is closed afterwards.
  #[instrument(name = "Session::rollback", skip(self), fields(session_id = self.inner.id))]
  pub async fn rollback(self) -> LabResult<()> {
    self.release(false).await?;
    debug!(statements = self.statement_count(), "Session rolled back.");
    Ok(())
  }

  async fn release(&self, commit: bool) -> LabResult<()> {
    let tx = self.inner.tx.lock().await.take();
    self.inner.open.store(false, Ordering::Release);
    match tx {
      Some(tx) if commit => tx.commit().await?,
      Some(tx) => tx.rollback().await?,
      None => return Err(LabError::SessionClosed),
    }
    Ok(())
  }

  /// Exclusive access to the session's connection. Never call another session
  /// method that issues a statement while holding the guard.
  pub(crate) async fn conn(&self) -> LabResult<MappedMutexGuard<'_, SqliteConnection>> {
    let guard = self.inner.tx.lock().await;
    MutexGuard::try_map(guard, |tx| tx.as_deref_mut()).map_err(|_| LabError::SessionClosed)
  }

  pub(crate) fn record(&self, sql: &str) {
    let n = self.inner.statements.fetch_add(1, Ordering::AcqRel) + 1;
    debug!(
      session_id = self.inner.id,
      statement = n,
      sql = %sql.split_whitespace().collect::<Vec<_>>().join(" "),
      "Statement executed."
    );
  }

  pub(crate) fn link(&self, owner: i64, association: &'static str) -> DeferredLink {
    DeferredLink::new(owner, association, self.weak())
  }

  fn weak(&self) -> Weak<SessionInner> {
    Arc::downgrade(&self.inner)
  }

  pub(crate) fn cached<E: Cached>(&self, id: i64) -> Option<Managed<E>> {
    self.inner.identity.lock().get::<E>(id)
  }

  /// Puts an entity under management, or returns the instance already
  /// managed for its id.
  pub(crate) fn manage<E: Cached>(&self, entity: E) -> Managed<E> {
    let id = entity.id();
    let handle = {
      let mut identity = self.inner.identity.lock();
      let slot = E::slot(&mut *identity);
      if let Some(existing) = slot.get(&id) {
        return existing.clone();
      }
      let handle = Managed::new(entity);
      slot.insert(id, handle.clone());
      handle
    };
    if self.inner.mode == SessionMode::ReadWrite {
      self.inner.tracked.lock().push(Box::new(Tracked::new(handle.clone())));
    }
    handle
  }
}

/// Runs `work` in a fresh session: commit on `Ok`, rollback on `Err`.
///
/// If the future panics or is dropped, the transaction is rolled back when
/// the last session handle goes away.
pub async fn run_in_session<T, F>(pool: &SqlitePool, mode: SessionMode, work: F) -> LabResult<Measured<T>>
where
  T: Send + 'static,
  F: FnOnce(Session) -> SessionFuture<T>,
{
  let session = Session::begin(pool, mode).await?;
  match work(session.clone()).await {
    Ok(value) => {
      let stats = session.commit().await?;
      Ok(Measured {
        value,
        statements: stats.statements,
      })
    }
    Err(err) => {
      if let Err(rollback_err) = session.rollback().await {
        warn!(error = %rollback_err, "Rollback after failed unit of work also failed.");
      }
      Err(err)
    }
  }
}
