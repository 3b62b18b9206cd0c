// ormlab/core/src/lab/mod.rs

//! The lab operations. Each one is a single unit of work demonstrating one
//! loading behavior; all of them report how many statements they issued.

mod reports;

pub use reports::{CartesianReport, FetchReport, JoinComparison};

use crate::error::{LabError, LabResult};
use crate::model::{Order, UserOrderCount, STATUS_UPDATED_WITHOUT_SAVE};
use crate::session::{run_in_session, Measured, SessionMode};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{info, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabSettings {
  /// Order loaded by the single-entity demos.
  pub demo_order_id: i64,
  pub projection_limit: usize,
  pub join_preview_limit: usize,
}

impl Default for LabSettings {
  fn default() -> Self {
    Self {
      demo_order_id: 1,
      projection_limit: 10,
      join_preview_limit: 5,
    }
  }
}

#[derive(Clone)]
pub struct LabService {
  pool: SqlitePool,
  settings: LabSettings,
}

impl LabService {
  pub fn new(pool: SqlitePool, settings: LabSettings) -> Self {
    Self { pool, settings }
  }

  pub fn settings(&self) -> &LabSettings {
    &self.settings
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }

  /// All orders, each with its owner resolved eagerly: one statement for the
  /// orders plus one per distinct owner.
  #[instrument(name = "lab::n_plus_one", skip(self))]
  pub async fn n_plus_one(&self) -> LabResult<Measured<Vec<Order>>> {
    let measured = run_in_session(&self.pool, SessionMode::ReadOnly, |session| {
      Box::pin(async move {
        let orders = session.all_orders().await?;
        let mut resolved = Vec::with_capacity(orders.len());
        for order in orders {
          let order = order.snapshot();
          let owner = order.user.get()?;
          trace!(order_id = order.id, owner = %owner.name, "Order owner resolved.");
          resolved.push(order);
        }
        Ok::<_, LabError>(resolved)
      })
    })
    .await?;
    info!(
      orders = measured.value.len(),
      statements = measured.statements,
      "N+1 demo finished."
    );
    Ok(measured)
  }

  /// Changes the demo order's status by assignment only; the commit writes it.
  #[instrument(name = "lab::dirty_checking", skip(self))]
  pub async fn dirty_checking(&self) -> LabResult<Measured<String>> {
    let order_id = self.settings.demo_order_id;
    run_in_session(&self.pool, SessionMode::ReadWrite, move |session| {
      Box::pin(async move {
        let order = session.find_order(order_id).await?;
        order.write().status = STATUS_UPDATED_WITHOUT_SAVE.to_string();
        // No save call: the session flushes the change on commit.
        let status = order.read().status.clone();
        Ok::<_, LabError>(format!("Order status updated to: {}", status))
      })
    })
    .await
  }

  /// Loads the demo order, lets its session close, then touches the products.
  #[instrument(name = "lab::lazy_exception", skip(self))]
  pub async fn lazy_exception(&self) -> LabResult<Measured<String>> {
    let order_id = self.settings.demo_order_id;
    let loaded = run_in_session(&self.pool, SessionMode::ReadOnly, move |session| {
      Box::pin(async move { session.find_order(order_id).await })
    })
    .await?;

    let text = match loaded.value.products().await {
      Ok(products) => format!("Number of products: {}", products.len()),
      Err(err) if err.is_detached_access() => {
        warn!(error = %err, "Detached access caught.");
        format!("Detached access caught: {}", err)
      }
      Err(err) => return Err(err),
    };
    Ok(Measured {
      value: text,
      statements: loaded.statements,
    })
  }

  /// Same load as `lazy_exception`, but the products are read before commit.
  #[instrument(name = "lab::lazy_correct", skip(self))]
  pub async fn lazy_correct(&self) -> LabResult<Measured<String>> {
    let order_id = self.settings.demo_order_id;
    run_in_session(&self.pool, SessionMode::ReadOnly, move |session| {
      Box::pin(async move {
        let order = session.find_order(order_id).await?;
        let products = order.products().await?;
        Ok::<_, LabError>(format!("Number of products (within transaction): {}", products.len()))
      })
    })
    .await
  }

  #[instrument(name = "lab::cartesian_explosion", skip(self))]
  pub async fn cartesian_explosion(&self) -> LabResult<Measured<CartesianReport>> {
    let measured = run_in_session(&self.pool, SessionMode::ReadOnly, |session| {
      Box::pin(async move {
        let graph = session.user_graphs().await?;
        Ok::<_, LabError>(CartesianReport::from_graph(&graph))
      })
    })
    .await?;
    info!(report = ?measured.value, "Cartesian explosion demo finished.");
    Ok(measured)
  }

  /// The same users-with-orders question asked with a plain join and with a
  /// join fetch, inside one session.
  #[instrument(name = "lab::join_vs_fetch", skip(self))]
  pub async fn join_vs_fetch(&self) -> LabResult<Measured<JoinComparison>> {
    let limit = self.settings.join_preview_limit;
    run_in_session(&self.pool, SessionMode::ReadOnly, move |session| {
      Box::pin(async move {
        let before = session.statement_count();
        let users = session.users_joined_with_orders(limit).await?;
        let mut orders = 0;
        for user in &users {
          orders += user.orders().await?.len();
        }
        let distinct_users = users.iter().map(|u| u.read().id).collect::<HashSet<_>>().len();
        let without_fetch = FetchReport {
          users: users.len(),
          distinct_users,
          orders,
          statements: session.statement_count() - before,
        };

        let before = session.statement_count();
        let users = session.users_fetching_orders(limit).await?;
        let orders = users
          .iter()
          .map(|u| u.orders.get().map(Vec::len))
          .sum::<LabResult<usize>>()?;
        let with_fetch = FetchReport {
          users: users.len(),
          distinct_users: users.len(),
          orders,
          statements: session.statement_count() - before,
        };

        Ok::<_, LabError>(JoinComparison {
          without_fetch,
          with_fetch,
        })
      })
    })
    .await
  }

  /// Top users by order count, shaped straight into `UserOrderCount`.
  #[instrument(name = "lab::dto_projection", skip(self))]
  pub async fn dto_projection(&self) -> LabResult<Measured<Vec<UserOrderCount>>> {
    let limit = self.settings.projection_limit;
    run_in_session(&self.pool, SessionMode::ReadOnly, move |session| {
      Box::pin(async move { session.order_counts(limit).await })
    })
    .await
  }
}
