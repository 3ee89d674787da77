//! Integration tests for Order Desk.
//!
//! Each test starts the full dashboard router on an ephemeral local port,
//! backed by an in-memory record store and a throwaway registry file, and
//! drives it over HTTP with a cookie-keeping client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p order-desk-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use order_desk_core::{City, NewOrder, Order};
use order_desk_dashboard::config::DashboardConfig;
use order_desk_dashboard::state::AppState;
use order_desk_dashboard::store::MemoryStore;
use reqwest::Client;
use tempfile::TempDir;

/// A running dashboard plus handles to its backing stores.
pub struct TestContext {
    /// `http://127.0.0.1:<port>`
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    _registry_dir: TempDir,
}

impl TestContext {
    /// Start a dashboard whose store holds `orders`.
    pub async fn start(orders: Vec<Order>) -> Self {
        let registry_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let vars = HashMap::from([
            ("ORDER_DESK_STORE", "memory".to_string()),
            (
                "ORDER_DESK_REGISTRY_PATH",
                registry_dir.path().join("employees.json").display().to_string(),
            ),
        ]);
        let config = DashboardConfig::from_vars(|key| vars.get(key).cloned())
            .expect("Failed to build test configuration");

        let store = Arc::new(MemoryStore::with_orders(orders));
        let state = AppState::with_store(config, store.clone())
            .await
            .expect("Failed to create application state");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let app = order_desk_dashboard::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
            state,
            _registry_dir: registry_dir,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A fresh client with its own cookie jar.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// A client logged in as `username`.
    ///
    /// Login redirects are followed, so the response body of the last hop
    /// is discarded.
    pub async fn login(&self, username: &str, code: &str) -> Client {
        let client = Self::client();
        let response = client
            .post(self.url("/auth/login"))
            .form(&[("username", username), ("code", code)])
            .send()
            .await
            .expect("Login request failed");
        assert!(response.status().is_success(), "login landed on {}", response.status());
        assert_ne!(response.url().path(), "/auth/login", "login was rejected");
        client
    }
}

/// A valid Pending order dated 2024-03-09.
#[must_use]
pub fn order(name: &str, phone: &str, city: City) -> Order {
    let draft = NewOrder {
        name: name.to_string(),
        phone: phone.to_string(),
        city: city.label().to_string(),
        region: String::new(),
        kind: "airtag".to_string(),
        price: "25000".to_string(),
        quantity: "1".to_string(),
        notes: String::new(),
    }
    .validate()
    .expect("Test order is valid");
    Order::create(draft, NaiveDate::from_ymd_opt(2024, 3, 9).expect("Valid date"))
}
