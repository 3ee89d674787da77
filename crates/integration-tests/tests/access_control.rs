//! End-to-end login, page permissions and user management.
//!
//! Run with: cargo test -p order-desk-integration-tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use order_desk_core::Page;
use order_desk_integration_tests::TestContext;
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::start(Vec::new()).await;
    let client = TestContext::client();

    let response = client.get(ctx.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    let response = client.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_visitors_are_sent_to_login() {
    let ctx = TestContext::start(Vec::new()).await;
    let client = TestContext::client();

    for path in ["/", "/home", "/orders", "/search", "/dashboard", "/settings"] {
        let response = client.get(ctx.url(path)).send().await.unwrap();
        assert_eq!(response.url().path(), "/auth/login", "{path}");
    }
}

#[tokio::test]
async fn test_wrong_code_is_rejected() {
    let ctx = TestContext::start(Vec::new()).await;
    let client = TestContext::client();

    let response = client
        .post(ctx.url("/auth/login"))
        .form(&[("username", "admin"), ("code", "guess")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.url().path(), "/auth/login");
    assert!(response.text().await.unwrap().contains("Invalid username or code"));

    let response = client.get(ctx.url("/orders")).send().await.unwrap();
    assert_eq!(response.url().path(), "/auth/login");
}

#[tokio::test]
async fn test_permissions_gate_pages() {
    let ctx = TestContext::start(Vec::new()).await;
    let admin = ctx.login("admin", "admin123").await;

    let page = admin
        .post(ctx.url("/settings/users"))
        .form(&[
            ("username", "sara"),
            ("code", "1111"),
            ("page", "Home"),
            ("page", "Search"),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("User sara added successfully!"));

    let sara = ctx.login("sara", "1111").await;
    let response = sara.get(ctx.url("/dashboard")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = sara.get(ctx.url("/settings")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = sara.get(ctx.url("/search")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    admin
        .post(ctx.url("/settings/permissions"))
        .form(&[("username", "sara"), ("page", "Dashboard")])
        .send()
        .await
        .unwrap();
    assert_eq!(
        ctx.state.registry().permitted_pages("sara").await,
        vec![Page::Dashboard]
    );

    // Changes apply to an existing session on its next request
    let response = sara.get(ctx.url("/home")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = sara.get(ctx.url("/")).send().await.unwrap();
    assert_eq!(response.url().path(), "/dashboard");
}

#[tokio::test]
async fn test_user_without_pages_sees_no_access() {
    let ctx = TestContext::start(Vec::new()).await;
    ctx.state
        .registry()
        .add_user("idle", "0000", false, &[])
        .await
        .unwrap();

    let client = TestContext::client();
    let response = client
        .post(ctx.url("/auth/login"))
        .form(&[("username", "idle"), ("code", "0000")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.url().path(), "/");
    assert!(response.text().await.unwrap().contains("no page permissions"));
}

#[tokio::test]
async fn test_deleted_user_loses_their_session() {
    let ctx = TestContext::start(Vec::new()).await;
    let admin = ctx.login("admin", "admin123").await;
    ctx.state
        .registry()
        .add_user("omar", "2222", false, &[Page::Home])
        .await
        .unwrap();
    let omar = ctx.login("omar", "2222").await;

    let page = admin
        .post(ctx.url("/settings/users/omar/delete"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("User omar deleted successfully!"));

    let response = omar.get(ctx.url("/home")).send().await.unwrap();
    assert_eq!(response.url().path(), "/auth/login");
}

#[tokio::test]
async fn test_admin_account_cannot_be_deleted() {
    let ctx = TestContext::start(Vec::new()).await;
    let admin = ctx.login("admin", "admin123").await;

    let page = admin
        .post(ctx.url("/settings/users/admin/delete"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("cannot be deleted"));
    assert!(ctx.state.registry().user("admin").await.is_some());
}

#[tokio::test]
async fn test_change_own_code_then_log_back_in() {
    let ctx = TestContext::start(Vec::new()).await;
    let admin = ctx.login("admin", "admin123").await;

    let page = admin
        .post(ctx.url("/settings/password"))
        .form(&[("current", "admin123"), ("new", "n3w"), ("confirm", "other")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("New access codes do not match"));

    let page = admin
        .post(ctx.url("/settings/password"))
        .form(&[("current", "admin123"), ("new", "n3w"), ("confirm", "n3w")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Password changed successfully!"));

    let response = admin.post(ctx.url("/auth/logout")).send().await.unwrap();
    assert_eq!(response.url().path(), "/auth/login");

    ctx.login("admin", "n3w").await;
}

#[tokio::test]
async fn test_login_records_the_device() {
    let ctx = TestContext::start(Vec::new()).await;
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .user_agent("Front desk tablet")
        .build()
        .unwrap();

    client
        .post(ctx.url("/auth/login"))
        .form(&[("username", "admin"), ("code", "admin123")])
        .send()
        .await
        .unwrap();

    let admin = ctx.state.registry().user("admin").await.unwrap();
    assert_eq!(admin.devices, vec!["Front desk tablet".to_string()]);

    let page = client
        .post(ctx.url("/settings/devices/admin/logout"))
        .send()
        .await
        .unwrap();
    // Logging yourself out ends the session
    assert_eq!(page.url().path(), "/auth/login");
    assert!(ctx.state.registry().user("admin").await.unwrap().devices.is_empty());
}
