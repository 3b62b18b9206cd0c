// ormlab/core/src/session/graph.rs

//! Folding joined rows back into aggregates. A join repeats the parent
//! columns once per child row; these functions keep the first copy of every
//! user, order and product and drop the rest.

use super::Session;
use crate::db::rows::{OrderRow, ProductRow, UserGraphRow, UserOrderRow, UserRow};
use crate::error::LabResult;
use crate::model::{Order, Product, Related, User};
use std::collections::BTreeMap;

type OrdersByUser = BTreeMap<i64, (UserRow, BTreeMap<i64, OrderRow>)>;

type ProductsByOrder = BTreeMap<i64, (OrderRow, BTreeMap<i64, ProductRow>)>;

pub(crate) fn users_with_orders(session: &Session, rows: Vec<UserOrderRow>, limit: Option<usize>) -> Vec<User> {
  let mut users: OrdersByUser = BTreeMap::new();
  for row in rows {
    let (_, orders) = users.entry(row.user_id).or_insert_with(|| (row.user(), BTreeMap::new()));
    orders.entry(row.order_id).or_insert_with(|| row.order());
  }

  users
    .into_values()
    .take(limit.unwrap_or(usize::MAX))
    .map(|(user, orders)| {
      let orders = orders
        .into_values()
        .map(|order| shallow_order(session, order, None))
        .collect();
      User::from_row(user, Related::Loaded(orders))
    })
    .collect()
}

pub(crate) fn users_with_orders_and_products(session: &Session, rows: Vec<UserGraphRow>) -> LabResult<Vec<User>> {
  let mut users: BTreeMap<i64, (UserRow, ProductsByOrder)> = BTreeMap::new();
  for row in rows {
    let (_, orders) = users.entry(row.user_id).or_insert_with(|| (row.user(), BTreeMap::new()));
    let (_, products) = orders
      .entry(row.order_id)
      .or_insert_with(|| (row.order(), BTreeMap::new()));
    products.entry(row.product_id).or_insert_with(|| row.product());
  }

  users
    .into_values()
    .map(|(user, orders)| {
      let orders = orders
        .into_values()
        .map(|(order, products)| {
          let products = products
            .into_values()
            .map(Product::from_row)
            .collect::<LabResult<Vec<_>>>()?;
          Ok(shallow_order(session, order, Some(products)))
        })
        .collect::<LabResult<Vec<_>>>()?;
      Ok(User::from_row(user, Related::Loaded(orders)))
    })
    .collect()
}

// The owner is the enclosing user, so the back reference stays deferred.
fn shallow_order(session: &Session, row: OrderRow, products: Option<Vec<Product>>) -> Order {
  let user = Related::Deferred(session.link(row.id, "Order.user"));
  let products = match products {
    Some(products) => Related::Loaded(products),
    None => Related::Deferred(session.link(row.id, "Order.products")),
  };
  Order::from_row(row, user, products)
}
