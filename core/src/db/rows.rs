// ormlab/core/src/db/rows.rs

//! Flat row shapes returned by the lab queries. Entities are assembled from
//! these by the session.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
  pub id: i64,
  pub name: String,
  pub email: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ProductRow {
  pub id: i64,
  pub name: String,
  pub description: Option<String>,
  pub price: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct OrderRow {
  pub id: i64,
  pub order_date: DateTime<Utc>,
  pub status: String,
  pub user_id: i64,
}

/// One row of `users JOIN orders`.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserOrderRow {
  pub user_id: i64,
  pub user_name: String,
  pub user_email: String,
  pub order_id: i64,
  pub order_date: DateTime<Utc>,
  pub order_status: String,
}

/// One row of `users JOIN orders JOIN order_product JOIN products`.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserGraphRow {
  pub user_id: i64,
  pub user_name: String,
  pub user_email: String,
  pub order_id: i64,
  pub order_date: DateTime<Utc>,
  pub order_status: String,
  pub product_id: i64,
  pub product_name: String,
  pub product_description: Option<String>,
  pub product_price: String,
}

impl UserOrderRow {
  pub fn user(&self) -> UserRow {
    UserRow {
      id: self.user_id,
      name: self.user_name.clone(),
      email: self.user_email.clone(),
    }
  }

  pub fn order(&self) -> OrderRow {
    OrderRow {
      id: self.order_id,
      order_date: self.order_date,
      status: self.order_status.clone(),
      user_id: self.user_id,
    }
  }
}

impl UserGraphRow {
  pub fn user(&self) -> UserRow {
    UserRow {
      id: self.user_id,
      name: self.user_name.clone(),
      email: self.user_email.clone(),
    }
  }

  pub fn order(&self) -> OrderRow {
    OrderRow {
      id: self.order_id,
      order_date: self.order_date,
      status: self.order_status.clone(),
      user_id: self.user_id,
    }
  }

  pub fn product(&self) -> ProductRow {
    ProductRow {
      id: self.product_id,
      name: self.product_name.clone(),
      description: self.product_description.clone(),
      price: self.product_price.clone(),
    }
  }
}
