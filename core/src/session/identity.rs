// ormlab/core/src/session/identity.rs

use crate::model::{Order, Product, User};
use crate::session::{Entity, Managed};
use std::collections::HashMap;

/// First-level cache: one managed instance per (entity kind, id) per session.
#[derive(Default)]
pub(crate) struct IdentityMap {
  users: HashMap<i64, Managed<User>>,
  orders: HashMap<i64, Managed<Order>>,
  products: HashMap<i64, Managed<Product>>,
}

pub(crate) trait Cached: Entity + Sized {
  fn slot(map: &mut IdentityMap) -> &mut HashMap<i64, Managed<Self>>;
}

impl Cached for User {
  fn slot(map: &mut IdentityMap) -> &mut HashMap<i64, Managed<Self>> {
    &mut map.users
  }
}

impl Cached for Order {
  fn slot(map: &mut IdentityMap) -> &mut HashMap<i64, Managed<Self>> {
    &mut map.orders
  }
}

impl Cached for Product {
  fn slot(map: &mut IdentityMap) -> &mut HashMap<i64, Managed<Self>> {
    &mut map.products
  }
}

impl IdentityMap {
  pub(crate) fn get<E: Cached>(&mut self, id: i64) -> Option<Managed<E>> {
    E::slot(self).get(&id).cloned()
  }

  pub(crate) fn len(&self) -> usize {
    self.users.len() + self.orders.len() + self.products.len()
  }
}
