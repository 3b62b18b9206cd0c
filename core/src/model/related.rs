// ormlab/core/src/model/related.rs

//! Explicit association state.
//!
//! An association is either `Loaded` or `Deferred`. Reading a deferred value
//! always goes through a fallible call, so code that touches an unloaded
//! association says so in its types instead of tripping over a proxy at runtime.

use crate::error::{LabError, LabResult};
use crate::session::{Session, SessionInner};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Weak;

#[derive(Clone)]
pub enum Related<T> {
  Loaded(T),
  Deferred(DeferredLink),
}

impl<T> Related<T> {
  pub fn is_loaded(&self) -> bool {
    matches!(self, Related::Loaded(_))
  }

  pub fn is_deferred(&self) -> bool {
    !self.is_loaded()
  }

  /// Returns the loaded value without touching the database.
  pub fn get(&self) -> LabResult<&T> {
    match self {
      Related::Loaded(value) => Ok(value),
      Related::Deferred(link) => Err(LabError::Uninitialized {
        association: link.association.to_string(),
      }),
    }
  }

  pub fn loaded(&self) -> Option<&T> {
    match self {
      Related::Loaded(value) => Some(value),
      Related::Deferred(_) => None,
    }
  }
}

impl<T: fmt::Debug> fmt::Debug for Related<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Related::Loaded(value) => f.debug_tuple("Loaded").field(value).finish(),
      Related::Deferred(link) => f.debug_tuple("Deferred").field(link).finish(),
    }
  }
}

// Deferred associations are skipped by the owning struct; if one is
// serialized anyway it shows up as null.
impl<T: Serialize> Serialize for Related<T> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Related::Loaded(value) => value.serialize(serializer),
      Related::Deferred(_) => serializer.serialize_none(),
    }
  }
}

/// Where a deferred association can be loaded from: the owning entity and a
/// weak handle to the session that produced it.
#[derive(Clone)]
pub struct DeferredLink {
  pub(crate) owner: i64,
  pub(crate) association: &'static str,
  pub(crate) session: Weak<SessionInner>,
}

impl DeferredLink {
  pub(crate) fn new(owner: i64, association: &'static str, session: Weak<SessionInner>) -> Self {
    Self {
      owner,
      association,
      session,
    }
  }

  pub fn owner(&self) -> i64 {
    self.owner
  }

  pub fn association(&self) -> &'static str {
    self.association
  }

  pub fn is_attached(&self) -> bool {
    self.session.upgrade().map(|s| s.is_open()).unwrap_or(false)
  }

  /// Re-enters the originating session, or fails with `DetachedAccess` when it
  /// has been committed, rolled back or dropped.
  pub(crate) fn attach(&self) -> LabResult<Session> {
    match self.session.upgrade() {
      Some(inner) if inner.is_open() => Ok(Session::from_inner(inner)),
      _ => Err(LabError::DetachedAccess {
        association: self.association.to_string(),
        owner: self.owner,
      }),
    }
  }
}

impl fmt::Debug for DeferredLink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DeferredLink")
      .field("owner", &self.owner)
      .field("association", &self.association)
      .field("attached", &self.is_attached())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dangling(association: &'static str) -> DeferredLink {
    DeferredLink::new(7, association, Weak::new())
  }

  #[test]
  fn get_on_deferred_reports_the_association() {
    let related: Related<Vec<i64>> = Related::Deferred(dangling("Order.products"));
    match related.get() {
      Err(LabError::Uninitialized { association }) => assert_eq!(association, "Order.products"),
      other => panic!("Expected Uninitialized, got {:?}", other),
    }
    assert!(related.loaded().is_none());
  }

  #[test]
  fn dangling_link_is_detached() {
    let link = dangling("User.orders");
    assert!(!link.is_attached());
    match link.attach() {
      Err(LabError::DetachedAccess { association, owner }) => {
        assert_eq!(association, "User.orders");
        assert_eq!(owner, 7);
      }
      Err(other) => panic!("Expected DetachedAccess, got {:?}", other),
      Ok(_) => panic!("Expected DetachedAccess, got a session"),
    }
  }

  #[test]
  fn loaded_value_serializes_transparently() {
    let related = Related::Loaded(vec![1, 2, 3]);
    assert!(related.is_loaded());
    assert_eq!(serde_json::to_string(&related).unwrap(), "[1,2,3]");
  }
}
