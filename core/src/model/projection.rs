// ormlab/core/src/model/projection.rs

use serde::Serialize;
use sqlx::FromRow;

/// Name plus order count, built straight from an aggregate query without
/// materializing users or orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserOrderCount {
  pub user_name: String,
  pub order_count: i64,
}
