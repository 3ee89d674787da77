//! In-process record store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use order_desk_core::Order;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError};

/// A [`RecordStore`] kept entirely in memory.
///
/// Used by tests and when the dashboard runs without spreadsheet
/// credentials. It can be switched into a failing mode to exercise the
/// error paths of the layers above it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Order>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `orders`.
    #[must_use]
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            rows: RwLock::new(orders),
            ..Self::default()
        }
    }

    /// Overwrite the stored rows without counting a write.
    pub async fn set_orders(&self, orders: Vec<Order>) {
        *self.rows.write().await = orders;
    }

    /// Current stored rows.
    pub async fn orders(&self) -> Vec<Order> {
        self.rows.read().await.clone()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful `replace_all` calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn describe(&self) -> String {
        "memory store".to_string()
    }

    async fn fetch(&self) -> Result<Vec<Order>, StoreError> {
        self.check()?;
        Ok(self.rows.read().await.clone())
    }

    async fn replace_all(&self, orders: &[Order]) -> Result<(), StoreError> {
        self.check()?;
        *self.rows.write().await = orders.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::order;

    #[tokio::test]
    async fn test_replace_all_counts_writes() {
        let store = MemoryStore::new();
        store.replace_all(&[order("Ali", "1")]).await.unwrap();
        store.replace_all(&[]).await.unwrap();

        assert_eq!(store.write_count(), 2);
        assert!(store.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_switch() {
        let store = MemoryStore::with_orders(vec![order("Ali", "1")]);
        store.set_failing(true);

        assert!(matches!(store.fetch().await, Err(StoreError::Unavailable(_))));
        assert!(store.replace_all(&[]).await.is_err());
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.orders().await.len(), 1);
    }
}
