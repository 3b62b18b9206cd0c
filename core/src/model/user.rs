// ormlab/core/src/model/user.rs

use crate::db::rows::UserRow;
use crate::error::LabResult;
use crate::model::{Order, Related};
use crate::session::Entity;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqliteConnection;

#[derive(Debug, Clone, Serialize)]
pub struct User {
  pub id: i64,
  pub name: String,
  pub email: String,
  // Reverse side of Order.user. Read-only: writes always go through the order.
  #[serde(skip_serializing_if = "Related::is_deferred")]
  pub orders: Related<Vec<Order>>,
}

/// The persistent columns of a user, compared by dirty checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserState {
  pub name: String,
  pub email: String,
}

impl User {
  pub(crate) fn from_row(row: UserRow, orders: Related<Vec<Order>>) -> Self {
    Self {
      id: row.id,
      name: row.name,
      email: row.email,
      orders,
    }
  }
}

#[async_trait]
impl Entity for User {
  const NAME: &'static str = "User";
  type State = UserState;

  fn id(&self) -> i64 {
    self.id
  }

  fn state(&self) -> UserState {
    UserState {
      name: self.name.clone(),
      email: self.email.clone(),
    }
  }

  async fn write_state(&self, conn: &mut SqliteConnection) -> LabResult<()> {
    sqlx::query("UPDATE users SET name = ?, email = ? WHERE id = ?")
      .bind(&self.name)
      .bind(&self.email)
      .bind(self.id)
      .execute(conn)
      .await?;
    Ok(())
  }
}
