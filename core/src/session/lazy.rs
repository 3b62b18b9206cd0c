// ormlab/core/src/session/lazy.rs

//! Resolving deferred associations on managed entities.
//!
//! A loaded association is returned as is. A deferred one is loaded through
//! the session that produced the entity, which must still be open; otherwise
//! the call fails with `LabError::DetachedAccess`.
//!
//! Managed handles cache what they load. Plain `Order` copies do not: every
//! `load_*` call on a deferred link issues its query again.

use crate::error::LabResult;
use crate::model::{Order, Product, Related, User};
use crate::session::Managed;
use tracing::{instrument, warn};

impl Managed<Order> {
  #[instrument(name = "Order::products", skip(self), fields(order_id = self.read().id))]
  pub async fn products(&self) -> LabResult<Vec<Product>> {
    let (order_id, link) = {
      let order = self.read();
      match &order.products {
        Related::Loaded(products) => return Ok(products.clone()),
        Related::Deferred(link) => (order.id, link.clone()),
      }
    };

    let session = link.attach().map_err(|err| {
      warn!(error = %err, "Deferred collection accessed outside its session.");
      err
    })?;
    let products = session.products_of_order(order_id).await?;
    self.write().products = Related::Loaded(products.clone());
    Ok(products)
  }
}

impl Managed<User> {
  #[instrument(name = "User::orders", skip(self), fields(user_id = self.read().id))]
  pub async fn orders(&self) -> LabResult<Vec<Order>> {
    let (user_id, link) = {
      let user = self.read();
      match &user.orders {
        Related::Loaded(orders) => return Ok(orders.clone()),
        Related::Deferred(link) => (user.id, link.clone()),
      }
    };

    let session = link.attach().map_err(|err| {
      warn!(error = %err, "Deferred collection accessed outside its session.");
      err
    })?;
    let orders = session.orders_of_user(user_id).await?;
    self.write().orders = Related::Loaded(orders.clone());
    Ok(orders)
  }
}

// Orders nested in a user's collection are plain values, not managed handles.
// Their deferred links still resolve through the session while it is open.
impl Order {
  #[instrument(name = "Order::load_user", skip(self), fields(order_id = self.id))]
  pub async fn load_user(&self) -> LabResult<User> {
    let link = match &self.user {
      Related::Loaded(user) => return Ok(user.clone()),
      Related::Deferred(link) => link.clone(),
    };
    let session = link.attach()?;
    Ok(session.find_user(self.user_id).await?.snapshot())
  }

  #[instrument(name = "Order::load_products", skip(self), fields(order_id = self.id))]
  pub async fn load_products(&self) -> LabResult<Vec<Product>> {
    let link = match &self.products {
      Related::Loaded(products) => return Ok(products.clone()),
      Related::Deferred(link) => link.clone(),
    };
    let session = link.attach()?;
    session.products_of_order(self.id).await
  }
}
