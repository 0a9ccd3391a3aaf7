use super::*;
use shared::domain::ImageRef;

fn order(id: &str, status: Option<OrderStatus>, total: f64) -> Order {
    Order {
        id: OrderId::from(id),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        phone: "555-0100".into(),
        email: "ada@example.com".into(),
        address: "12 Analytical Way".into(),
        city: "London".into(),
        zip_code: "N1".into(),
        total,
        discount: 5.0,
        order_date: "2025-02-10T09:30:00Z".into(),
        status,
        cart_items: vec![CartItem {
            product_name: "Chair".into(),
            image: Some(ImageRef("image-abc-40x40-png".into())),
        }],
    }
}

#[tokio::test]
async fn lists_orders_in_insert_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_order(&order("o2", None, 20.0))
        .await
        .expect("insert o2");
    storage
        .upsert_order(&order("o1", Some(OrderStatus::Pending), 50.0))
        .await
        .expect("insert o1");

    let orders = storage.list_orders().await.expect("list");
    let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["o2", "o1"]);
    assert_eq!(orders[1], order("o1", Some(OrderStatus::Pending), 50.0));
}

#[tokio::test]
async fn upsert_keeps_original_position() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.upsert_order(&order("a", None, 1.0)).await.expect("a");
    storage.upsert_order(&order("b", None, 2.0)).await.expect("b");
    storage
        .upsert_order(&order("a", Some(OrderStatus::Success), 9.0))
        .await
        .expect("a again");

    let orders = storage.list_orders().await.expect("list");
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id.as_str(), "a");
    assert_eq!(orders[0].total, 9.0);
    assert_eq!(storage.count_orders().await.expect("count"), 2);
}

#[tokio::test]
async fn set_status_reports_unknown_order() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_order(&order("o1", Some(OrderStatus::Pending), 50.0))
        .await
        .expect("insert");

    let updated = storage
        .set_order_status(&OrderId::from("o1"), OrderStatus::Dispatch)
        .await
        .expect("update")
        .expect("known order");
    assert_eq!(updated.status, Some(OrderStatus::Dispatch));
    assert_eq!(updated.total, 50.0);

    let missing = storage
        .set_order_status(&OrderId::from("nope"), OrderStatus::Dispatch)
        .await
        .expect("update");
    assert!(missing.is_none());
}

#[tokio::test]
async fn delete_removes_only_the_target() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.upsert_order(&order("o1", None, 1.0)).await.expect("o1");
    storage.upsert_order(&order("o2", None, 2.0)).await.expect("o2");

    assert!(storage
        .delete_order(&OrderId::from("o2"))
        .await
        .expect("delete"));
    assert!(!storage
        .delete_order(&OrderId::from("o2"))
        .await
        .expect("delete twice"));

    let orders = storage.list_orders().await.expect("list");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id.as_str(), "o1");
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("orders.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage
        .upsert_order(&order("o1", None, 1.0))
        .await
        .expect("insert");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(reopened.count_orders().await.expect("count"), 1);
}
