// ormlab/core/src/seed.rs

//! Deterministic sample data.
//!
//! `SeedPlan::generate` draws everything from a seeded RNG up front, so the
//! same seed and the same reference time always produce the same rows.
//! `seed_database` then writes the plan in a single transaction.

use crate::error::{LabError, LabResult};
use crate::model::{STATUS_COMPLETED, STATUS_PENDING};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::{info, instrument};

/// Order dates reach back at most this many days (about a thousand years).
pub const MAX_DATE_WINDOW_DAYS: i64 = 365_000;

#[derive(Debug, Clone)]
pub struct SeedConfig {
  pub seed: u64,
  pub users: usize,
  pub products: usize,
  pub orders: usize,
  pub max_products_per_order: usize,
  pub date_window_days: i64,
}

impl Default for SeedConfig {
  fn default() -> Self {
    Self {
      seed: 42,
      users: 100,
      products: 50,
      orders: 1000,
      max_products_per_order: 5,
      date_window_days: 30,
    }
  }
}

impl SeedConfig {
  pub fn with_seed(seed: u64) -> Self {
    Self {
      seed,
      ..Self::default()
    }
  }

  fn validate(&self) -> LabResult<()> {
    if self.orders > 0 && (self.users == 0 || self.products == 0) {
      return Err(LabError::InvalidSeedConfig(
        "orders need at least one user and one product".to_string(),
      ));
    }
    if self.max_products_per_order == 0 {
      return Err(LabError::InvalidSeedConfig(
        "max_products_per_order must be at least 1".to_string(),
      ));
    }
    if self.date_window_days <= 0 || self.date_window_days > MAX_DATE_WINDOW_DAYS {
      return Err(LabError::InvalidSeedConfig(format!(
        "date_window_days must be between 1 and {}",
        MAX_DATE_WINDOW_DAYS
      )));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
  pub users: usize,
  pub products: usize,
  pub orders: usize,
  pub order_products: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUser {
  pub name: String,
  pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedProduct {
  pub name: String,
  pub description: String,
  pub price: Decimal,
}

/// Users and products are referenced by their index in the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOrder {
  pub user: usize,
  pub order_date: DateTime<Utc>,
  pub status: &'static str,
  pub products: BTreeSet<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedPlan {
  pub users: Vec<PlannedUser>,
  pub products: Vec<PlannedProduct>,
  pub orders: Vec<PlannedOrder>,
}

impl SeedPlan {
  pub fn generate(config: &SeedConfig, now: DateTime<Utc>) -> LabResult<Self> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let users = (0..config.users)
      .map(|i| PlannedUser {
        name: format!("User {}", i),
        email: format!("user{}@example.com", i),
      })
      .collect();

    // 10.00 ..= 109.99, exact to the cent
    let products = (0..config.products)
      .map(|i| PlannedProduct {
        name: format!("Product {}", i),
        description: format!("Description for product {}", i),
        price: Decimal::new(rng.gen_range(1_000..11_000), 2),
      })
      .collect();

    let mut orders = Vec::with_capacity(config.orders);
    for _ in 0..config.orders {
      let user = rng.gen_range(0..config.users);
      let days_back = rng.gen_range(0..config.date_window_days);
      let order_date = Duration::try_days(days_back)
        .and_then(|back| now.checked_sub_signed(back))
        .ok_or_else(|| {
          LabError::InvalidSeedConfig(format!("{} days before {} is out of range", days_back, now))
        })?;
      let status = if rng.gen_bool(0.5) { STATUS_COMPLETED } else { STATUS_PENDING };
      // Repeated picks collapse, as in a set-valued association.
      let picks = rng.gen_range(1..=config.max_products_per_order);
      let products = (0..picks).map(|_| rng.gen_range(0..config.products)).collect();
      orders.push(PlannedOrder {
        user,
        order_date,
        status,
        products,
      });
    }

    Ok(Self {
      users,
      products,
      orders,
    })
  }

  pub fn summary(&self) -> SeedSummary {
    SeedSummary {
      users: self.users.len(),
      products: self.products.len(),
      orders: self.orders.len(),
      order_products: self.orders.iter().map(|o| o.products.len()).sum(),
    }
  }
}

/// Generates a plan from `config` and writes it in one transaction.
/// Any storage failure rolls the whole seed back.
#[instrument(name = "seed::seed_database", skip(pool, config), fields(seed = config.seed))]
pub async fn seed_database(pool: &SqlitePool, config: &SeedConfig, now: DateTime<Utc>) -> LabResult<SeedSummary> {
  let plan = SeedPlan::generate(config, now)?;
  let mut tx = pool.begin().await?;

  let mut user_ids = Vec::with_capacity(plan.users.len());
  for user in &plan.users {
    let id = sqlx::query("INSERT INTO users (name, email) VALUES (?, ?)")
      .bind(&user.name)
      .bind(&user.email)
      .execute(&mut *tx)
      .await?
      .last_insert_rowid();
    user_ids.push(id);
  }

  let mut product_ids = Vec::with_capacity(plan.products.len());
  for product in &plan.products {
    let id = sqlx::query("INSERT INTO products (name, description, price) VALUES (?, ?, ?)")
      .bind(&product.name)
      .bind(&product.description)
      .bind(product.price.to_string())
      .execute(&mut *tx)
      .await?
      .last_insert_rowid();
    product_ids.push(id);
  }

  for order in &plan.orders {
    let order_id = sqlx::query("INSERT INTO orders (order_date, status, user_id) VALUES (?, ?, ?)")
      .bind(order.order_date)
      .bind(order.status)
      .bind(user_ids[order.user])
      .execute(&mut *tx)
      .await?
      .last_insert_rowid();
    for &product in &order.products {
      sqlx::query("INSERT INTO order_product (order_id, product_id) VALUES (?, ?)")
        .bind(order_id)
        .bind(product_ids[product])
        .execute(&mut *tx)
        .await?;
    }
  }

  tx.commit().await?;

  let summary = plan.summary();
  info!(
    users = summary.users,
    products = summary.products,
    orders = summary.orders,
    order_products = summary.order_products,
    "Data initialization complete."
  );
  Ok(summary)
}
