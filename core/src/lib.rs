// src/lib.rs

//! ORM Lab: a small, explicit unit-of-work layer over SQLite that reproduces
//! the classic object-relational loading pitfalls against a three-entity
//! schema (users, products, orders).
//!
//! What the lab shows:
//!  - N+1 loading when every order resolves its owner separately.
//!  - Detached access when a deferred collection is read after its session closed.
//!  - Dirty checking: field assignments on managed entities written at commit.
//!  - Cartesian row explosion from multi-level join fetches, and the
//!    in-memory deduplication that hides it.
//!  - Plain joins vs join fetches, and projections that skip entities entirely.
//!
//! Associations are never hidden behind proxies: they are `Related::Loaded`
//! or `Related::Deferred`, and resolving a deferred one is an explicit async
//! call that can fail.

pub mod db;
pub mod error;
pub mod lab;
pub mod model;
pub mod seed;
pub mod session;

// --- Re-exports for the Public API ---

pub use crate::db::{connect, reset_schema, DbSettings};
pub use crate::error::{LabError, LabResult};
pub use crate::lab::{CartesianReport, FetchReport, JoinComparison, LabService, LabSettings};
pub use crate::model::{Order, Product, Related, User, UserOrderCount};
pub use crate::seed::{seed_database, SeedConfig, SeedPlan, SeedSummary, MAX_DATE_WINDOW_DAYS};
pub use crate::session::{run_in_session, Entity, FetchedGraph, Managed, Measured, Session, SessionFuture, SessionMode, SessionStats};

/*
    Typical setup:
    1. `connect(&DbSettings::in_memory())` to get a pool.
    2. `reset_schema(&pool)` and `seed_database(&pool, &SeedConfig::default(), Utc::now())`.
    3. `LabService::new(pool, LabSettings::default())` and call any demo.
    4. For ad-hoc work, `run_in_session(&pool, mode, |session| Box::pin(async move { ... }))`
       commits on Ok and rolls back on Err.
*/
