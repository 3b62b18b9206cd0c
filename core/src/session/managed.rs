// ormlab/core/src/session/managed.rs

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A session-managed entity: shared ownership plus interior mutability using
/// parking_lot::RwLock.
///
/// The owning session keeps a snapshot of the persistent state next to this
/// handle; assignments made through `write()` are picked up at flush time.
///
/// IMPORTANT: Lock guards obtained from this struct are blocking and MUST NOT
/// be held across `.await` suspension points in asynchronous code.
pub struct Managed<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> Managed<T> {
  pub(crate) fn new(entity: T) -> Self {
    Managed(Arc::new(RwLock::new(entity)))
  }

  /// The returned guard MUST be dropped before any `.await` point.
  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  /// The returned guard MUST be dropped before any `.await` point.
  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// True when both handles point at the same managed instance.
  pub fn same_instance(&self, other: &Managed<T>) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl<T: Clone + Send + Sync + 'static> Managed<T> {
  /// Detached copy of the current state.
  pub fn snapshot(&self) -> T {
    self.0.read().clone()
  }
}

impl<T: Send + Sync + 'static> Clone for Managed<T> {
  fn clone(&self) -> Self {
    Managed(Arc::clone(&self.0))
  }
}

impl<T: fmt::Debug + Send + Sync + 'static> fmt::Debug for Managed<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Managed").field(&*self.0.read()).finish()
  }
}

impl<T: Serialize + Send + Sync + 'static> Serialize for Managed<T> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.0.read().serialize(serializer)
  }
}
