// ormlab/core/src/session/queries.rs

//! Lookups and lab queries. Every statement is issued on the session's
//! connection and counted.

use super::graph;
use super::Session;
use crate::db::rows::{OrderRow, ProductRow, UserGraphRow, UserOrderRow, UserRow};
use crate::error::{LabError, LabResult};
use crate::model::{Order, Product, Related, User, UserOrderCount};
use crate::session::{Entity, Managed};
use tracing::{instrument, warn};

const SELECT_USER: &str = "SELECT id, name, email FROM users WHERE id = ?";

const SELECT_PRODUCT: &str = "SELECT id, name, description, price FROM products WHERE id = ?";

const SELECT_ORDER: &str = "SELECT id, order_date, status, user_id FROM orders WHERE id = ?";

const SELECT_ALL_ORDERS: &str = "SELECT id, order_date, status, user_id FROM orders ORDER BY id";

const SELECT_ORDERS_OF_USER: &str = "SELECT id, order_date, status, user_id FROM orders WHERE user_id = ? ORDER BY id";

const SELECT_PRODUCTS_OF_ORDER: &str = "
  SELECT p.id, p.name, p.description, p.price
  FROM products p
  JOIN order_product op ON op.product_id = p.id
  WHERE op.order_id = ?
  ORDER BY p.id";

// Plain join: the orders only filter and multiply the user rows.
const SELECT_USERS_JOIN_ORDERS: &str = "
  SELECT u.id, u.name, u.email
  FROM users u
  JOIN orders o ON o.user_id = u.id
  ORDER BY o.id
  LIMIT ?";

const SELECT_USERS_FETCH_ORDERS: &str = "
  SELECT u.id AS user_id, u.name AS user_name, u.email AS user_email,
         o.id AS order_id, o.order_date AS order_date, o.status AS order_status
  FROM users u
  JOIN orders o ON o.user_id = u.id
  ORDER BY u.id, o.id";

const SELECT_USER_GRAPHS: &str = "
  SELECT u.id AS user_id, u.name AS user_name, u.email AS user_email,
         o.id AS order_id, o.order_date AS order_date, o.status AS order_status,
         p.id AS product_id, p.name AS product_name,
         p.description AS product_description, p.price AS product_price
  FROM users u
  JOIN orders o ON o.user_id = u.id
  JOIN order_product op ON op.order_id = o.id
  JOIN products p ON p.id = op.product_id
  ORDER BY u.id, o.id, p.id";

const SELECT_ORDER_COUNTS: &str = "
  SELECT u.name AS user_name, COUNT(o.id) AS order_count
  FROM users u
  LEFT JOIN orders o ON o.user_id = u.id
  GROUP BY u.id, u.name
  ORDER BY order_count DESC, u.id ASC
  LIMIT ?";

// SQLite reads a negative LIMIT as "no limit", so the bound saturates instead of wrapping.
fn sql_limit(limit: usize) -> i64 {
  i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Users with their orders and each order's products, deduplicated from one
/// joined result set.
#[derive(Debug, Clone)]
pub struct FetchedGraph {
  pub users: Vec<User>,
  /// Rows the join actually returned before deduplication.
  pub raw_rows: usize,
}

impl Session {
  /// Identity-mapped user lookup. Its orders are deferred.
  #[instrument(name = "Session::find_user", skip(self), fields(session_id = self.id()))]
  pub async fn find_user(&self, id: i64) -> LabResult<Managed<User>> {
    if let Some(hit) = self.cached::<User>(id) {
      return Ok(hit);
    }
    let row = {
      let mut conn = self.conn().await?;
      let row = sqlx::query_as::<_, UserRow>(SELECT_USER)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
      self.record(SELECT_USER);
      row
    };
    let row = row.ok_or(LabError::NotFound { entity: User::NAME, id })?;
    let orders = Related::Deferred(self.link(row.id, "User.orders"));
    Ok(self.manage(User::from_row(row, orders)))
  }

  #[instrument(name = "Session::find_product", skip(self), fields(session_id = self.id()))]
  pub async fn find_product(&self, id: i64) -> LabResult<Managed<Product>> {
    if let Some(hit) = self.cached::<Product>(id) {
      return Ok(hit);
    }
    let row = {
      let mut conn = self.conn().await?;
      let row = sqlx::query_as::<_, ProductRow>(SELECT_PRODUCT)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
      self.record(SELECT_PRODUCT);
      row
    };
    let row = row.ok_or(LabError::NotFound { entity: Product::NAME, id })?;
    Ok(self.manage(Product::from_row(row)?))
  }

  /// Identity-mapped order lookup. The owning user is resolved eagerly, the
  /// products are deferred.
  #[instrument(name = "Session::find_order", skip(self), fields(session_id = self.id()))]
  pub async fn find_order(&self, id: i64) -> LabResult<Managed<Order>> {
    if let Some(hit) = self.cached::<Order>(id) {
      return Ok(hit);
    }
    let row = {
      let mut conn = self.conn().await?;
      let row = sqlx::query_as::<_, OrderRow>(SELECT_ORDER)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
      self.record(SELECT_ORDER);
      row
    };
    let row = row.ok_or(LabError::NotFound { entity: Order::NAME, id })?;
    self.manage_order_row(row).await
  }

  /// Every order in one statement, then one user lookup per distinct owner
  /// not yet in the identity map.
  #[instrument(name = "Session::all_orders", skip(self), fields(session_id = self.id()))]
  pub async fn all_orders(&self) -> LabResult<Vec<Managed<Order>>> {
    let rows = {
      let mut conn = self.conn().await?;
      let rows = sqlx::query_as::<_, OrderRow>(SELECT_ALL_ORDERS)
        .fetch_all(&mut *conn)
        .await?;
      self.record(SELECT_ALL_ORDERS);
      rows
    };
    let mut orders = Vec::with_capacity(rows.len());
    for row in rows {
      orders.push(self.manage_order_row(row).await?);
    }
    Ok(orders)
  }

  async fn manage_order_row(&self, row: OrderRow) -> LabResult<Managed<Order>> {
    if let Some(hit) = self.cached::<Order>(row.id) {
      return Ok(hit);
    }
    let user = self.find_user(row.user_id).await?.snapshot();
    let products = Related::Deferred(self.link(row.id, "Order.products"));
    Ok(self.manage(Order::from_row(row, Related::Loaded(user), products)))
  }

  pub(crate) async fn products_of_order(&self, order_id: i64) -> LabResult<Vec<Product>> {
    let rows = {
      let mut conn = self.conn().await?;
      let rows = sqlx::query_as::<_, ProductRow>(SELECT_PRODUCTS_OF_ORDER)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;
      self.record(SELECT_PRODUCTS_OF_ORDER);
      rows
    };
    rows.into_iter().map(Product::from_row).collect()
  }

  pub(crate) async fn orders_of_user(&self, user_id: i64) -> LabResult<Vec<Order>> {
    let rows = {
      let mut conn = self.conn().await?;
      let rows = sqlx::query_as::<_, OrderRow>(SELECT_ORDERS_OF_USER)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
      self.record(SELECT_ORDERS_OF_USER);
      rows
    };
    Ok(
      rows
        .into_iter()
        .map(|row| {
          let user = Related::Deferred(self.link(row.id, "Order.user"));
          let products = Related::Deferred(self.link(row.id, "Order.products"));
          Order::from_row(row, user, products)
        })
        .collect(),
    )
  }

  /// `users JOIN orders` without fetching: one managed user per returned row
  /// (the same instance when a user repeats), orders left deferred.
  #[instrument(name = "Session::users_joined_with_orders", skip(self), fields(session_id = self.id()))]
  pub async fn users_joined_with_orders(&self, limit: usize) -> LabResult<Vec<Managed<User>>> {
    let rows = {
      let mut conn = self.conn().await?;
      let rows = sqlx::query_as::<_, UserRow>(SELECT_USERS_JOIN_ORDERS)
        .bind(sql_limit(limit))
        .fetch_all(&mut *conn)
        .await?;
      self.record(SELECT_USERS_JOIN_ORDERS);
      rows
    };
    Ok(
      rows
        .into_iter()
        .map(|row| match self.cached::<User>(row.id) {
          Some(hit) => hit,
          None => {
            let orders = Related::Deferred(self.link(row.id, "User.orders"));
            self.manage(User::from_row(row, orders))
          }
        })
        .collect(),
    )
  }

  /// `users JOIN FETCH orders` in a single statement. The join cannot be
  /// limited in SQL without cutting collections short, so `limit` is applied
  /// to distinct users after the whole result set is read.
  #[instrument(name = "Session::users_fetching_orders", skip(self), fields(session_id = self.id()))]
  pub async fn users_fetching_orders(&self, limit: usize) -> LabResult<Vec<User>> {
    let rows = {
      let mut conn = self.conn().await?;
      let rows = sqlx::query_as::<_, UserOrderRow>(SELECT_USERS_FETCH_ORDERS)
        .fetch_all(&mut *conn)
        .await?;
      self.record(SELECT_USERS_FETCH_ORDERS);
      rows
    };
    warn!(
      rows = rows.len(),
      limit, "Limit specified with collection fetch; applying in memory."
    );
    Ok(graph::users_with_orders(self, rows, Some(limit)))
  }

  /// Users, their orders and every order's products from one three-way join.
  #[instrument(name = "Session::user_graphs", skip(self), fields(session_id = self.id()))]
  pub async fn user_graphs(&self) -> LabResult<FetchedGraph> {
    let rows = {
      let mut conn = self.conn().await?;
      let rows = sqlx::query_as::<_, UserGraphRow>(SELECT_USER_GRAPHS)
        .fetch_all(&mut *conn)
        .await?;
      self.record(SELECT_USER_GRAPHS);
      rows
    };
    let raw_rows = rows.len();
    let users = graph::users_with_orders_and_products(self, rows)?;
    Ok(FetchedGraph { users, raw_rows })
  }

  /// Name and order count per user, highest count first.
  #[instrument(name = "Session::order_counts", skip(self), fields(session_id = self.id()))]
  pub async fn order_counts(&self, limit: usize) -> LabResult<Vec<UserOrderCount>> {
    let mut conn = self.conn().await?;
    let counts = sqlx::query_as::<_, UserOrderCount>(SELECT_ORDER_COUNTS)
      .bind(sql_limit(limit))
      .fetch_all(&mut *conn)
      .await?;
    self.record(SELECT_ORDER_COUNTS);
    Ok(counts)
  }
}
