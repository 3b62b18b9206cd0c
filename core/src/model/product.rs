// ormlab/core/src/model/product.rs

use crate::db::rows::ProductRow;
use crate::error::LabResult;
use crate::session::Entity;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqliteConnection;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub description: Option<String>,
  pub price: Decimal, // Stored as TEXT, never as a float
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductState {
  pub name: String,
  pub description: Option<String>,
  pub price: Decimal,
}

impl Product {
  pub(crate) fn from_row(row: ProductRow) -> LabResult<Self> {
    Ok(Self {
      id: row.id,
      name: row.name,
      description: row.description,
      price: Decimal::from_str(&row.price)?,
    })
  }
}

#[async_trait]
impl Entity for Product {
  const NAME: &'static str = "Product";
  type State = ProductState;

  fn id(&self) -> i64 {
    self.id
  }

  fn state(&self) -> ProductState {
    ProductState {
      name: self.name.clone(),
      description: self.description.clone(),
      price: self.price,
    }
  }

  async fn write_state(&self, conn: &mut SqliteConnection) -> LabResult<()> {
    sqlx::query("UPDATE products SET name = ?, description = ?, price = ? WHERE id = ?")
      .bind(&self.name)
      .bind(&self.description)
      .bind(self.price.to_string())
      .bind(self.id)
      .execute(conn)
      .await?;
    Ok(())
  }
}
