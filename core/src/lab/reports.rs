// ormlab/core/src/lab/reports.rs

use crate::session::FetchedGraph;
use serde::Serialize;
use std::fmt;

/// Counts from the three-way join fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartesianReport {
  pub users: usize,
  pub orders: usize,
  pub product_links: usize,
  /// Rows the database returned before deduplication.
  pub raw_rows: usize,
}

impl CartesianReport {
  pub fn from_graph(graph: &FetchedGraph) -> Self {
    let orders = graph.users.iter().filter_map(|u| u.orders.loaded());
    let (orders, product_links) = orders.fold((0, 0), |(o, p), user_orders| {
      let links: usize = user_orders
        .iter()
        .filter_map(|order| order.products.loaded())
        .map(Vec::len)
        .sum();
      (o + user_orders.len(), p + links)
    });
    Self {
      users: graph.users.len(),
      orders,
      product_links,
      raw_rows: graph.raw_rows,
    }
  }
}

impl fmt::Display for CartesianReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Cartesian Explosion Demo: Fetched {} users with {} orders and {} product associations. \
       The join returned {} rows: every user was repeated once per (order, product) pair \
       and every order once per product, then deduplicated in memory.",
      self.users, self.orders, self.product_links, self.raw_rows
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchReport {
  /// Users as returned by the query, repeats included.
  pub users: usize,
  pub distinct_users: usize,
  /// Orders counted by walking each returned user's collection.
  pub orders: usize,
  pub statements: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinComparison {
  pub without_fetch: FetchReport,
  pub with_fetch: FetchReport,
}

impl fmt::Display for JoinComparison {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let plain = &self.without_fetch;
    writeln!(f, "=== JOIN without FETCH ===")?;
    writeln!(
      f,
      "Fetched {} users ({} distinct) with {} orders.",
      plain.users, plain.distinct_users, plain.orders
    )?;
    writeln!(
      f,
      "Issued {} statements: 1 for users + {} for orders (N+1).",
      plain.statements,
      plain.statements.saturating_sub(1)
    )?;
    writeln!(f)?;

    let fetched = &self.with_fetch;
    writeln!(f, "=== JOIN FETCH ===")?;
    writeln!(
      f,
      "Fetched {} users ({} distinct) with {} orders.",
      fetched.users, fetched.distinct_users, fetched.orders
    )?;
    writeln!(
      f,
      "Issued {} statement(s): everything loaded in the initial round trip (no N+1).",
      fetched.statements
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn join_comparison_text_has_both_sections() {
    let comparison = JoinComparison {
      without_fetch: FetchReport {
        users: 5,
        distinct_users: 4,
        orders: 52,
        statements: 5,
      },
      with_fetch: FetchReport {
        users: 5,
        distinct_users: 5,
        orders: 49,
        statements: 1,
      },
    };
    let text = comparison.to_string();
    assert!(text.starts_with("=== JOIN without FETCH ===\n"));
    assert!(text.contains("Fetched 5 users (4 distinct) with 52 orders."));
    assert!(text.contains("1 for users + 4 for orders"));
    assert!(text.contains("=== JOIN FETCH ===\nFetched 5 users (5 distinct) with 49 orders."));
  }

  #[test]
  fn cartesian_text_reports_raw_rows() {
    let report = CartesianReport {
      users: 3,
      orders: 4,
      product_links: 9,
      raw_rows: 9,
    };
    let text = report.to_string();
    assert!(text.starts_with("Cartesian Explosion Demo: Fetched 3 users with 4 orders and 9 product associations."));
    assert!(text.contains("The join returned 9 rows"));
  }
}
