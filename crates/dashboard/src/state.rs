//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::info;

use crate::access::{AccessError, Registry};
use crate::config::{DashboardConfig, StoreConfig};
use crate::notices::Notices;
use crate::orders::{OrderBook, persist::PersistQueue};
use crate::store::sheets::auth::ServiceAccountKey;
use crate::store::{CachedStore, GoogleSheetsStore, MemoryStore, RecordStore, StoreError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("record store: {0}")]
    Store(#[from] StoreError),
    #[error("user registry: {0}")]
    Access(#[from] AccessError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Owns the order book, the user registry and
/// the notice board; per-user state lives in the session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    orders: OrderBook,
    registry: Registry,
    notices: Notices,
}

impl AppState {
    /// Assemble state from already-built parts.
    #[must_use]
    pub fn new(
        config: DashboardConfig,
        orders: OrderBook,
        registry: Registry,
        notices: Notices,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                orders,
                registry,
                notices,
            }),
        }
    }

    /// Build state from configuration, opening the configured record store.
    ///
    /// Spawns the persistence worker, so this must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if the store credentials are unusable or the
    /// registry file cannot be opened.
    pub async fn build(config: DashboardConfig) -> Result<Self, StateError> {
        let store = open_store(&config.store)?;
        Self::with_store(config, store).await
    }

    /// Build state around an explicit record store.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Access` if the registry file cannot be opened.
    pub async fn with_store(
        config: DashboardConfig,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, StateError> {
        let notices = Notices::new();
        let cached = CachedStore::new(store, config.read_cache, notices.clone());
        let described = cached.describe();
        let queue = PersistQueue::spawn(cached.clone(), notices.clone());
        let orders = OrderBook::new(cached, queue);
        let registry = Registry::open(&config.registry_path).await?;

        info!(
            store = %described,
            registry = %registry.path().display(),
            "Application state ready"
        );

        Ok(Self::new(config, orders, registry, notices))
    }

    /// Get a reference to the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// Get a reference to the order book.
    #[must_use]
    pub fn orders(&self) -> &OrderBook {
        &self.inner.orders
    }

    /// Get a reference to the user registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Get a reference to the shared notice board.
    #[must_use]
    pub fn notices(&self) -> &Notices {
        &self.inner.notices
    }
}

/// Create the record store named by the configuration.
///
/// # Errors
///
/// Returns `StoreError::Credentials` if the service-account key is invalid.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("Using the in-memory record store; orders will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::GoogleSheets(sheets) => {
            let key = ServiceAccountKey::from_json(sheets.service_account_json.expose_secret())?;
            let store = GoogleSheetsStore::new(key, sheets.locator.clone())?;
            Ok(Arc::new(store))
        }
    }
}
