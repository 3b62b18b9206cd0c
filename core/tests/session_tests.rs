// tests/session_tests.rs
mod common;
use common::*;
use ormlab::{run_in_session, LabError, Related, Session, SessionMode};
use std::collections::HashSet;

#[tokio::test]
async fn test_identity_map_returns_same_instance_without_requery() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();

  let first = session.find_user(3).await.unwrap();
  let second = session.find_user(3).await.unwrap();
  assert!(first.same_instance(&second));
  assert_eq!(session.statement_count(), 1);
  assert_eq!(first.read().name, "User 2"); // ids start at 1, names at 0

  session.commit().await.unwrap();
}

#[tokio::test]
async fn test_find_order_resolves_owner_eagerly_and_defers_products() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();

  let order = session.find_order(1).await.unwrap();
  {
    let order = order.read();
    let owner = order.user.get().unwrap();
    assert_eq!(owner.id, order.user_id);
    assert!(order.products.is_deferred());
    assert!(matches!(order.products.get(), Err(LabError::Uninitialized { .. })));
  }
  // One for the order, one for its owner.
  assert_eq!(session.statement_count(), 2);
  session.commit().await.unwrap();
}

#[tokio::test]
async fn test_missing_order_is_not_found() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();

  match session.find_order(999_999).await {
    Err(LabError::NotFound { entity, id }) => {
      assert_eq!(entity, "Order");
      assert_eq!(id, 999_999);
    }
    other => panic!("Expected NotFound, got {:?}", other.map(|o| o.snapshot())),
  }
  session.rollback().await.unwrap();
}

#[tokio::test]
async fn test_assignment_is_flushed_on_commit_without_save() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadWrite).await.unwrap();
  let order = session.find_order(1).await.unwrap();
  order.write().status = "SHIPPED".to_string();
  assert!(session.is_dirty());
  let stats = session.commit().await.unwrap();
  assert_eq!(stats.flushed, 1);

  assert_eq!(order_status(&pool, 1).await, "SHIPPED");

  // And through a fresh session.
  let reread = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  assert_eq!(reread.find_order(1).await.unwrap().read().status, "SHIPPED");
  reread.commit().await.unwrap();
}

#[tokio::test]
async fn test_clean_entities_are_not_written() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadWrite).await.unwrap();
  let order = session.find_order(1).await.unwrap();
  let original = order.read().status.clone();
  order.write().status = original.clone(); // same value: not dirty
  assert!(!session.is_dirty());
  let stats = session.commit().await.unwrap();
  assert_eq!(stats.flushed, 0);
  assert_eq!(stats.statements, 2);
}

#[tokio::test]
async fn test_read_only_session_discards_assignments() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let before = order_status(&pool, 1).await;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let order = session.find_order(1).await.unwrap();
  order.write().status = "IGNORED".to_string();
  assert_eq!(session.flush().await.unwrap(), 0);
  let stats = session.commit().await.unwrap();
  assert_eq!(stats.flushed, 0);

  assert_eq!(order_status(&pool, 1).await, before);
}

#[tokio::test]
async fn test_rollback_discards_flushed_changes() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let before = order_status(&pool, 1).await;

  let session = Session::begin(&pool, SessionMode::ReadWrite).await.unwrap();
  let order = session.find_order(1).await.unwrap();
  order.write().status = "CANCELLED".to_string();
  assert_eq!(session.flush().await.unwrap(), 1);
  // Flushed but not committed.
  session.rollback().await.unwrap();

  assert_eq!(order_status(&pool, 1).await, before);
}

#[tokio::test]
async fn test_run_in_session_rolls_back_on_error() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let before = order_status(&pool, 1).await;

  let result = run_in_session(&pool, SessionMode::ReadWrite, |session| {
    Box::pin(async move {
      let order = session.find_order(1).await?;
      order.write().status = "HALF_DONE".to_string();
      session.flush().await?;
      session.find_order(999_999).await?; // fails after the write
      Ok::<_, LabError>(())
    })
  })
  .await;

  assert!(matches!(result, Err(LabError::NotFound { .. })));
  assert_eq!(order_status(&pool, 1).await, before);
}

#[tokio::test]
async fn test_run_in_session_commits_and_counts() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let measured = run_in_session(&pool, SessionMode::ReadWrite, |session| {
    Box::pin(async move {
      let product = session.find_product(1).await?;
      product.write().name = "Renamed".to_string();
      let id = product.read().id;
      Ok::<_, LabError>(id)
    })
  })
  .await
  .unwrap();

  assert_eq!(measured.value, 1);
  assert_eq!(measured.statements, 2); // SELECT + flushed UPDATE
  let name: String = sqlx::query_scalar("SELECT name FROM products WHERE id = 1")
    .fetch_one(&pool)
    .await
    .unwrap();
  assert_eq!(name, "Renamed");
}

#[tokio::test]
async fn test_products_load_inside_session_once() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let expected = product_count_of(&pool, 1).await as usize;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let order = session.find_order(1).await.unwrap();
  let products = order.products().await.unwrap();
  assert_eq!(products.len(), expected);
  assert!((1..=5).contains(&products.len()));

  let before = session.statement_count();
  let again = order.products().await.unwrap();
  assert_eq!(again, products);
  assert_eq!(session.statement_count(), before);
  assert!(order.read().products.is_loaded());

  let ids: HashSet<i64> = products.iter().map(|p| p.id).collect();
  assert_eq!(ids.len(), products.len());
  session.commit().await.unwrap();
}

#[tokio::test]
async fn test_products_after_commit_are_detached() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let order = session.find_order(1).await.unwrap();
  session.commit().await.unwrap();

  match order.products().await {
    Err(LabError::DetachedAccess { association, owner }) => {
      assert_eq!(association, "Order.products");
      assert_eq!(owner, 1);
    }
    other => panic!("Expected DetachedAccess, got {:?}", other),
  }
  assert!(order.read().products.is_deferred());
}

#[tokio::test]
async fn test_detached_even_while_a_clone_is_alive() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let keep_alive = session.clone();
  let user = session.find_user(1).await.unwrap();
  session.rollback().await.unwrap();

  assert!(!keep_alive.is_open());
  assert!(matches!(user.orders().await, Err(LabError::DetachedAccess { .. })));
  assert!(matches!(keep_alive.find_user(2).await, Err(LabError::SessionClosed)));
}

#[tokio::test]
async fn test_user_orders_resolve_inside_session() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let expected: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = 1")
    .fetch_one(&pool)
    .await
    .unwrap();

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let user = session.find_user(1).await.unwrap();
  let orders = user.orders().await.unwrap();
  assert_eq!(orders.len() as i64, expected);
  assert!(orders.iter().all(|o| o.user_id == 1));
  assert!(orders.windows(2).all(|w| w[0].id < w[1].id));
  session.commit().await.unwrap();
}

#[tokio::test]
async fn test_all_orders_queries_each_owner_once() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let owners = distinct_order_owners(&pool).await as usize;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let orders = session.all_orders().await.unwrap();
  assert_eq!(orders.len(), 1000);
  assert_eq!(session.statement_count(), 1 + owners);
  assert!(orders.iter().all(|o| o.read().user.is_loaded()));
  session.commit().await.unwrap();
}

#[tokio::test]
async fn test_user_graph_has_no_duplicates() {
  setup_tracing();
  let (pool, summary) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let graph = session.user_graphs().await.unwrap();
  assert_eq!(session.statement_count(), 1);
  session.commit().await.unwrap();

  let mut user_ids = HashSet::new();
  let mut order_ids = HashSet::new();
  let mut links = HashSet::new();
  for user in &graph.users {
    assert!(user_ids.insert(user.id), "user {} repeated", user.id);
    for order in user.orders.get().unwrap() {
      assert!(order_ids.insert(order.id), "order {} repeated", order.id);
      assert_eq!(order.user_id, user.id);
      for product in order.products.get().unwrap() {
        assert!(links.insert((order.id, product.id)), "link repeated");
      }
    }
  }

  assert_eq!(order_ids.len(), summary.orders);
  assert_eq!(links.len(), summary.order_products);
  assert_eq!(graph.raw_rows, summary.order_products);
  assert!(graph.raw_rows > graph.users.len());
}

#[tokio::test]
async fn test_join_fetch_limits_distinct_users_in_memory() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let users = session.users_fetching_orders(5).await.unwrap();
  assert_eq!(session.statement_count(), 1);
  session.commit().await.unwrap();

  assert!(users.len() <= 5);
  let ids: HashSet<i64> = users.iter().map(|u| u.id).collect();
  assert_eq!(ids.len(), users.len());
  for user in &users {
    let orders = user.orders.get().unwrap();
    let expected: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?")
      .bind(user.id)
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(orders.len() as i64, expected);
  }
}

#[tokio::test]
async fn test_plain_join_repeats_share_one_instance() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let users = session.users_joined_with_orders(50).await.unwrap();
  assert_eq!(users.len(), 50);
  for (i, a) in users.iter().enumerate() {
    for b in &users[i + 1..] {
      let same_id = a.read().id == b.read().id;
      assert_eq!(same_id, a.same_instance(b));
    }
  }
  assert!(users.iter().all(|u| u.read().orders.is_deferred()));
  session.commit().await.unwrap();
}

#[tokio::test]
async fn test_order_counts_sorted_and_limited() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let top = session.order_counts(10).await.unwrap();
  let all = session.order_counts(1_000).await.unwrap();
  session.commit().await.unwrap();

  assert_eq!(top.len(), 10);
  assert!(top.windows(2).all(|w| w[0].order_count >= w[1].order_count));
  assert_eq!(all.len(), 100); // every user, including those without orders
  assert_eq!(all.iter().map(|c| c.order_count).sum::<i64>(), 1000);
  assert_eq!(&all[..10], &top[..]);
}

#[tokio::test]
async fn test_related_loaded_values_serialize_and_deferred_are_skipped() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let order = session.find_order(1).await.unwrap();
  let json = serde_json::to_value(&order).unwrap();
  assert!(json.get("products").is_none());
  assert!(json["user"]["name"].as_str().unwrap().starts_with("User "));
  assert!(json.get("orderDate").is_some());

  order.products().await.unwrap();
  let json = serde_json::to_value(&order).unwrap();
  assert!(json["products"].as_array().map(|p| !p.is_empty()).unwrap_or(false));
  // Decimal prices serialize as exact strings.
  assert!(json["products"][0]["price"].is_string());
  session.commit().await.unwrap();

  assert!(matches!(order.read().user, Related::Loaded(_)));
}

#[tokio::test]
async fn test_huge_limits_saturate_instead_of_wrapping() {
  setup_tracing();
  let (pool, summary) = seeded_pool().await;
  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();

  let joined = session.users_joined_with_orders(usize::MAX).await.unwrap();
  assert_eq!(joined.len(), summary.orders);
  let counts = session.order_counts(usize::MAX).await.unwrap();
  assert_eq!(counts.len(), summary.users);
  assert!(session.order_counts(0).await.unwrap().is_empty());
  session.commit().await.unwrap();
}

#[tokio::test]
async fn test_nested_orders_resolve_their_links_inside_session() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let expected = product_count_of(&pool, 1).await as usize;
  let owner: i64 = sqlx::query_scalar("SELECT user_id FROM orders WHERE id = 1")
    .fetch_one(&pool)
    .await
    .unwrap();

  let session = Session::begin(&pool, SessionMode::ReadOnly).await.unwrap();
  let user = session.find_user(owner).await.unwrap();
  let orders = user.orders().await.unwrap();
  let first = orders.iter().find(|o| o.id == 1).unwrap();
  assert!(first.user.is_deferred());
  assert!(first.products.is_deferred());

  let back = first.load_user().await.unwrap();
  assert_eq!(back.id, owner);
  assert_eq!(first.load_products().await.unwrap().len(), expected);

  // Fetched aggregates carry the same kind of links.
  let fetched = session.users_fetching_orders(1).await.unwrap();
  let nested = &fetched[0].orders.get().unwrap()[0];
  assert_eq!(nested.load_user().await.unwrap().id, fetched[0].id);
  assert!(!nested.load_products().await.unwrap().is_empty());
  session.commit().await.unwrap();

  match first.load_products().await {
    Err(LabError::DetachedAccess { association, owner }) => {
      assert_eq!(association, "Order.products");
      assert_eq!(owner, 1);
    }
    other => panic!("Expected DetachedAccess, got {:?}", other),
  }
  assert!(matches!(first.load_user().await, Err(LabError::DetachedAccess { .. })));
}

#[tokio::test]
async fn test_failed_flush_returns_the_flush_error_and_rolls_back() {
  setup_tracing();
  let (pool, _) = seeded_pool().await;
  let before = order_status(&pool, 1).await;

  let session = Session::begin(&pool, SessionMode::ReadWrite).await.unwrap();
  let order = session.find_order(1).await.unwrap();
  {
    let mut order = order.write();
    order.status = "ORPHANED".to_string();
    order.user_id = 999_999; // violates the users foreign key
  }
  match session.clone().commit().await {
    Err(LabError::Storage(_)) => {}
    other => panic!("Expected the flush's storage error, got {:?}", other),
  }
  assert!(!session.is_open());
  drop(session);

  assert_eq!(order_status(&pool, 1).await, before);
}
