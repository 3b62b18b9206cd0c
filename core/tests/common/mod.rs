// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use ormlab::{connect, reset_schema, seed_database, DbSettings, SeedConfig, SeedSummary};
use sqlx::SqlitePool;
use tracing::Level;

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn fixed_now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

// --- Pools ---
// Each in-memory pool is its own database, so tests never see each other's data.
// The pool holds a single connection: never query it while a session is open.

pub async fn empty_pool() -> SqlitePool {
  let pool = connect(&DbSettings::in_memory()).await.expect("in-memory pool");
  reset_schema(&pool).await.expect("schema");
  pool
}

pub async fn seeded_pool_with(config: &SeedConfig) -> (SqlitePool, SeedSummary) {
  let pool = empty_pool().await;
  let summary = seed_database(&pool, config, fixed_now()).await.expect("seed");
  (pool, summary)
}

pub async fn seeded_pool() -> (SqlitePool, SeedSummary) {
  seeded_pool_with(&SeedConfig::default()).await
}

// --- Direct reads, bypassing sessions ---

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
  sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn order_status(pool: &SqlitePool, order_id: i64) -> String {
  sqlx::query_scalar::<_, String>("SELECT status FROM orders WHERE id = ?")
    .bind(order_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn product_count_of(pool: &SqlitePool, order_id: i64) -> i64 {
  sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_product WHERE order_id = ?")
    .bind(order_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn distinct_order_owners(pool: &SqlitePool) -> i64 {
  sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT user_id) FROM orders")
    .fetch_one(pool)
    .await
    .unwrap()
}
