// ormlab/core/src/model/order.rs

use crate::db::rows::OrderRow;
use crate::error::LabResult;
use crate::model::{Product, Related, User};
use crate::session::Entity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_UPDATED_WITHOUT_SAVE: &str = "UPDATED_WITHOUT_SAVE";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: i64,
  pub order_date: DateTime<Utc>,
  pub status: String, // Free-form; the seed only writes PENDING/COMPLETED
  #[serde(skip)]
  pub user_id: i64,
  // Resolved eagerly whenever an order is loaded on its own.
  #[serde(skip_serializing_if = "Related::is_deferred")]
  pub user: Related<User>,
  // Unique by product id, ordered by id.
  #[serde(skip_serializing_if = "Related::is_deferred")]
  pub products: Related<Vec<Product>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderState {
  pub order_date: DateTime<Utc>,
  pub status: String,
  pub user_id: i64,
}

impl Order {
  pub(crate) fn from_row(row: OrderRow, user: Related<User>, products: Related<Vec<Product>>) -> Self {
    Self {
      id: row.id,
      order_date: row.order_date,
      status: row.status,
      user_id: row.user_id,
      user,
      products,
    }
  }
}

#[async_trait]
impl Entity for Order {
  const NAME: &'static str = "Order";
  type State = OrderState;

  fn id(&self) -> i64 {
    self.id
  }

  fn state(&self) -> OrderState {
    OrderState {
      order_date: self.order_date,
      status: self.status.clone(),
      user_id: self.user_id,
    }
  }

  async fn write_state(&self, conn: &mut SqliteConnection) -> LabResult<()> {
    sqlx::query("UPDATE orders SET order_date = ?, status = ?, user_id = ? WHERE id = ?")
      .bind(self.order_date)
      .bind(&self.status)
      .bind(self.user_id)
      .bind(self.id)
      .execute(conn)
      .await?;
    Ok(())
  }
}
