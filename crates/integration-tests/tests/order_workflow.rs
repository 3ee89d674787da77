//! End-to-end order workflow: intake, status changes, edit, search,
//! analytics and store failures.
//!
//! Run with: cargo test -p order-desk-integration-tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use order_desk_core::{City, OrderStatus};
use order_desk_integration_tests::{TestContext, order};
use reqwest::StatusCode;

#[tokio::test]
async fn test_orders_move_through_the_workflow() {
    let ali = order("Ali Hassan", "0751234567", City::Erbil);
    let sara = order("Sara Ahmed", "0779876543", City::Basra);
    let ctx = TestContext::start(vec![ali.clone(), sara.clone()]).await;
    let client = ctx.login("admin", "admin123").await;

    let page = client
        .get(ctx.url("/orders?tab=pending"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Ali Hassan"));
    assert!(page.contains("Sara Ahmed"));

    // Deliver Ali and come back to the Delivered tab
    let response = client
        .post(ctx.url(&format!("/orders/{}/status", ali.id)))
        .form(&[("status", "Delivered"), ("back", "/orders?tab=delivered")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.url().path(), "/orders");
    let page = response.text().await.unwrap();
    assert!(page.contains("Order moved to Delivered"));
    assert!(page.contains("Ali Hassan"));
    assert!(!page.contains("Sara Ahmed"));

    ctx.state.orders().queue().flush().await;
    let stored = ctx.store.orders().await;
    let stored_ali = stored.iter().find(|o| o.id == ali.id).unwrap();
    assert_eq!(stored_ali.status, OrderStatus::Delivered);

    // Revenue counts delivered orders only
    let page = client
        .get(ctx.url("/dashboard"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Delivered revenue"));
    assert!(page.contains("25.000"));
}

#[tokio::test]
async fn test_intake_records_a_pending_order() {
    let ctx = TestContext::start(Vec::new()).await;
    let client = ctx.login("admin", "admin123").await;

    let page = client
        .post(ctx.url("/home"))
        .form(&[
            ("name", "Omar"),
            ("phone", "0770000000"),
            ("city", City::Najaf.label()),
            ("region", "Old city"),
            ("kind", "smartwatch"),
            ("price", "45,000"),
            ("quantity", "2"),
            ("notes", "call first"),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Order for Omar recorded"));

    let orders = ctx.state.orders().snapshot().await;
    assert_eq!(orders.len(), 1);
    let omar = orders.first().unwrap();
    assert_eq!(omar.status, OrderStatus::Pending);
    assert_eq!(omar.quantity, 2);
    assert_eq!(omar.price.display(), "45.000");
    assert!(omar.created_on.is_some());
}

#[tokio::test]
async fn test_invalid_intake_is_rejected() {
    let ctx = TestContext::start(Vec::new()).await;
    let client = ctx.login("admin", "admin123").await;

    let page = client
        .post(ctx.url("/home"))
        .form(&[
            ("name", "Omar"),
            ("city", City::Najaf.label()),
            ("kind", "airtag"),
            ("price", "900000"),
            ("quantity", "1"),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Order not recorded"));
    assert!(ctx.state.orders().snapshot().await.is_empty());
}

#[tokio::test]
async fn test_notification_orders_can_be_edited() {
    let sara = order("Sara", "0779876543", City::Basra);
    let ctx = TestContext::start(vec![sara.clone()]).await;
    let client = ctx.login("admin", "admin123").await;

    client
        .post(ctx.url(&format!("/orders/{}/status", sara.id)))
        .form(&[("status", "Notification")])
        .send()
        .await
        .unwrap();

    let page = client
        .get(ctx.url(&format!("/orders/{}/edit", sara.id)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("value=\"Sara\""));

    let response = client
        .post(ctx.url(&format!("/orders/{}/edit", sara.id)))
        .form(&[
            ("name", "Sara Ahmed"),
            ("phone", "0779876543"),
            ("city", City::Kirkuk.label()),
            ("region", ""),
            ("kind", "airtag"),
            ("price", "30000"),
            ("quantity", "3"),
            ("notes", "new address"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.url().query(), Some("tab=notification"));
    assert!(response.text().await.unwrap().contains("Sara Ahmed"));

    let edited = ctx.state.orders().get(sara.id).await.unwrap();
    assert_eq!(edited.status, OrderStatus::Notification);
    assert_eq!(edited.city, City::Kirkuk);
    assert_eq!(edited.quantity, 3);
    assert_eq!(edited.created_on, sara.created_on);
}

#[tokio::test]
async fn test_search_finds_by_name_and_phone() {
    let ctx = TestContext::start(vec![
        order("Ali Hassan", "0751234567", City::Erbil),
        order("Sara Ahmed", "0779876543", City::Basra),
    ])
    .await;
    let client = ctx.login("admin", "admin123").await;

    let by_phone = client
        .get(ctx.url("/search?q=0779"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(by_phone.contains("Sara Ahmed"));
    assert!(!by_phone.contains("Ali Hassan"));

    let by_name = client
        .get(ctx.url("/search?q=ali"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(by_name.contains("Ali Hassan"));
}

async fn intake(ctx: &TestContext, client: &reqwest::Client, name: &str) -> String {
    client
        .post(ctx.url("/home"))
        .form(&[
            ("name", name),
            ("phone", "0770000000"),
            ("city", City::Najaf.label()),
            ("region", ""),
            ("kind", "airtag"),
            ("price", "45000"),
            ("quantity", "1"),
            ("notes", ""),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_store_outage_blocks_changes_and_recovers() {
    let ctx = TestContext::start(vec![order("Ali Hassan", "0751234567", City::Erbil)]).await;
    let client = ctx.login("admin", "admin123").await;

    ctx.store.set_failing(true);
    let response = client
        .post(ctx.url("/orders/refresh"))
        .form(&[("back", "/orders?tab=pending")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = response.text().await.unwrap();
    assert!(page.contains("Could not load orders"));
    assert!(page.contains("nothing was changed"));
    assert!(!page.contains("Ali Hassan"));

    // Saving now would replace the stored table with just this order
    let page = intake(&ctx, &client, "Omar").await;
    assert!(page.contains("Order not recorded"));
    ctx.state.orders().queue().flush().await;
    assert_eq!(ctx.store.write_count(), 0);

    // The next page view loads again without a manual refresh
    ctx.store.set_failing(false);
    let page = client
        .get(ctx.url("/orders?tab=pending"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Ali Hassan"));

    let page = intake(&ctx, &client, "Omar").await;
    assert!(page.contains("Order for Omar recorded"));
    ctx.state.orders().queue().flush().await;
    let names: Vec<_> = ctx.store.orders().await.into_iter().map(|o| o.name).collect();
    assert_eq!(names, ["Omar", "Ali Hassan"]);

    let page = client
        .post(ctx.url("/orders/refresh"))
        .form(&[("back", "/orders?tab=pending")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Reloaded 2 orders"));
}

#[tokio::test]
async fn test_edit_page_for_unknown_order_is_not_found() {
    let ctx = TestContext::start(Vec::new()).await;
    let client = ctx.login("admin", "admin123").await;

    let response = client
        .get(ctx.url(&format!("/orders/{}/edit", order_desk_core::OrderId::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
