//! Record store adapter.
//!
//! Orders live in a remote spreadsheet table. [`RecordStore`] is the seam
//! between the dashboard and that table; [`GoogleSheetsStore`] talks to the
//! real thing and [`MemoryStore`] stands in for it in tests and credential-free
//! development. [`CachedStore`] wraps either one with a time-bounded read
//! cache.

pub mod codec;
mod memory;
pub mod sheets;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use order_desk_core::Order;
use thiserror::Error;
use tracing::instrument;

use crate::notices::Notices;

pub use memory::MemoryStore;
pub use sheets::GoogleSheetsStore;

/// Errors that can occur talking to the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Credentials were rejected or the token exchange failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limited by the remote API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Remote API returned an unexpected status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response excerpt.
        message: String,
    },

    /// The spreadsheet could not be located.
    #[error("Spreadsheet not found: {0}")]
    SheetNotFound(String),

    /// A stored row could not be decoded into an order.
    #[error("Row {row}, column `{column}`: {message}")]
    Decode {
        /// 1-based sheet row number (the header is row 1).
        row: usize,
        /// Column key.
        column: String,
        /// What was wrong.
        message: String,
    },

    /// The service-account key is unusable.
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// The store is unreachable.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// A table of orders that can be read whole and replaced whole.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short human-readable name used in logs and notices.
    fn describe(&self) -> String;

    /// Read every row as an order, in table order.
    async fn fetch(&self) -> Result<Vec<Order>, StoreError>;

    /// Replace the entire table with `orders`, header row first.
    async fn replace_all(&self, orders: &[Order]) -> Result<(), StoreError>;
}

/// Cache key for the single cached table read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CacheKey {
    AllRows,
}

/// Read-through cache over a [`RecordStore`].
///
/// Reads are served from memory for the configured window. Failed reads are
/// never cached.
#[derive(Clone)]
pub struct CachedStore {
    inner: Arc<dyn RecordStore>,
    cache: Cache<CacheKey, Arc<Vec<Order>>>,
    notices: Notices,
}

impl std::fmt::Debug for CachedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedStore")
            .field("inner", &self.inner.describe())
            .finish_non_exhaustive()
    }
}

impl CachedStore {
    /// Wrap a store with a read cache of the given lifetime.
    #[must_use]
    pub fn new(inner: Arc<dyn RecordStore>, ttl: Duration, notices: Notices) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self {
            inner,
            cache,
            notices,
        }
    }

    /// Load every order.
    ///
    /// A failure is logged and posted as a notice before it is returned, and
    /// is never cached.
    ///
    /// # Errors
    ///
    /// Returns the underlying `StoreError`.
    #[instrument(skip(self), fields(store = %self.inner.describe()))]
    pub async fn load(&self) -> Result<Vec<Order>, StoreError> {
        if let Some(hit) = self.cache.get(&CacheKey::AllRows).await {
            tracing::debug!(count = hit.len(), "Order cache hit");
            return Ok(hit.as_ref().clone());
        }

        match self.inner.fetch().await {
            Ok(orders) => {
                tracing::info!(count = orders.len(), "Loaded orders from record store");
                self.cache
                    .insert(CacheKey::AllRows, Arc::new(orders.clone()))
                    .await;
                Ok(orders)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load orders");
                self.notices.warn(format!(
                    "Could not load orders from {}: {e}",
                    self.inner.describe()
                ));
                Err(e)
            }
        }
    }

    /// Replace the whole table.
    ///
    /// The read cache is dropped after a successful write.
    ///
    /// # Errors
    ///
    /// Returns the underlying `StoreError`.
    #[instrument(skip(self, orders), fields(store = %self.inner.describe(), count = orders.len()))]
    pub async fn save(&self, orders: &[Order]) -> Result<(), StoreError> {
        self.inner.replace_all(orders).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Force the next [`load`](Self::load) to go to the store.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&CacheKey::AllRows).await;
    }

    /// Name of the wrapped store.
    #[must_use]
    pub fn describe(&self) -> String {
        self.inner.describe()
    }
}
