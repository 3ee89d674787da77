//! The order book: the authoritative in-process order list.
//!
//! Orders are loaded lazily from the record store on first access. Every
//! mutation is applied to memory under a write lock, so a read right after
//! a mutation observes it, and then a snapshot is queued for background
//! persistence. The list is kept most-recent-first.
//!
//! Each save replaces the whole table, so a book that failed to load must
//! never be saved. Until a load succeeds, reads see an empty list and every
//! mutation is refused with [`OrderError::Unavailable`]; the next access
//! tries the store again.

pub mod persist;

use std::sync::Arc;

use chrono::NaiveDate;
use order_desk_core::{Order, OrderDraft, OrderId, OrderPatch, OrderStatus, ValidationError};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::store::{CachedStore, StoreError};

pub use persist::{PersistQueue, QueueStatus, SaveJob};

/// Errors from order book operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// An index no longer points at an order.
    #[error("Order {index} no longer exists (list has {len} orders)")]
    StaleReference {
        /// Requested index.
        index: usize,
        /// Current list length.
        len: usize,
    },

    /// No order has this id.
    #[error("Order {0} not found")]
    UnknownOrder(OrderId),

    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The orders could not be loaded, so nothing was changed.
    #[error("Orders could not be loaded, nothing was changed: {0}")]
    Unavailable(#[from] StoreError),
}

/// Today's date in local time.
fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Shared, cheaply cloneable order book.
#[derive(Clone)]
pub struct OrderBook {
    inner: Arc<OrderBookInner>,
}

struct OrderBookInner {
    store: CachedStore,
    queue: PersistQueue,
    orders: RwLock<Option<Vec<Order>>>,
    today: fn() -> NaiveDate,
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("store", &self.inner.store)
            .field("queue", &self.inner.queue)
            .finish_non_exhaustive()
    }
}

impl OrderBook {
    /// Create an order book over a store and its persistence queue.
    #[must_use]
    pub fn new(store: CachedStore, queue: PersistQueue) -> Self {
        Self::with_clock(store, queue, local_today)
    }

    /// Like [`new`](Self::new) with a custom source for "today".
    #[must_use]
    pub fn with_clock(store: CachedStore, queue: PersistQueue, today: fn() -> NaiveDate) -> Self {
        Self {
            inner: Arc::new(OrderBookInner {
                store,
                queue,
                orders: RwLock::new(None),
                today,
            }),
        }
    }

    /// The persistence queue.
    #[must_use]
    pub fn queue(&self) -> &PersistQueue {
        &self.inner.queue
    }

    /// Name of the backing record store.
    #[must_use]
    pub fn describe(&self) -> String {
        self.inner.store.describe()
    }

    /// Load the list into `slot` unless it is already there.
    async fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<Vec<Order>>,
    ) -> Result<&'a mut Vec<Order>, StoreError> {
        if slot.is_none() {
            *slot = Some(self.inner.store.load().await?);
        }
        Ok(slot.get_or_insert_with(Vec::new))
    }

    /// Run `f` on the loaded list, then queue a snapshot if it succeeded.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<Order>) -> Result<T, OrderError>,
    ) -> Result<T, OrderError> {
        let mut guard = self.inner.orders.write().await;
        let orders = self.ensure_loaded(&mut guard).await?;

        let out = f(orders)?;
        self.inner.queue.enqueue(orders.clone());
        Ok(out)
    }

    /// Run `f` on the loaded list without changing it.
    ///
    /// If the list cannot be loaded, `f` sees an empty one.
    async fn read<T>(&self, f: impl FnOnce(&[Order]) -> T) -> T {
        {
            let guard = self.inner.orders.read().await;
            if let Some(orders) = guard.as_ref() {
                return f(orders);
            }
        }

        let mut guard = self.inner.orders.write().await;
        match self.ensure_loaded(&mut guard).await {
            Ok(orders) => f(orders),
            Err(_) => f(&[]),
        }
    }

    /// Record a new Pending order dated today, at the front of the list.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Unavailable` if the orders cannot be loaded.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn insert(&self, draft: OrderDraft) -> Result<Order, OrderError> {
        let order = Order::create(draft, (self.inner.today)());
        let created = order.clone();
        self.mutate(move |orders| {
            orders.insert(0, order);
            Ok(())
        })
        .await?;
        tracing::info!(order_id = %created.id, "Order created");
        Ok(created)
    }

    /// Set the status of the order at `index`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::StaleReference` if `index` is out of range, or
    /// `OrderError::Unavailable` if the orders cannot be loaded.
    #[instrument(skip(self))]
    pub async fn update_status(&self, index: usize, status: OrderStatus) -> Result<(), OrderError> {
        self.mutate(|orders| set_status_at(orders, index, status))
            .await
    }

    /// Remove the order at `index`; later orders shift down by one.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::StaleReference` if `index` is out of range, or
    /// `OrderError::Unavailable` if the orders cannot be loaded.
    #[instrument(skip(self))]
    pub async fn delete(&self, index: usize) -> Result<Order, OrderError> {
        self.mutate(|orders| remove_at(orders, index)).await
    }

    /// Merge `patch` into the order at `index`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::StaleReference` if `index` is out of range, or
    /// `OrderError::Unavailable` if the orders cannot be loaded.
    #[instrument(skip(self, patch))]
    pub async fn edit(&self, index: usize, patch: OrderPatch) -> Result<(), OrderError> {
        self.mutate(|orders| edit_at(orders, index, patch)).await
    }

    /// Current index of the order with this id.
    pub async fn position(&self, id: OrderId) -> Option<usize> {
        self.read(|orders| find(orders, id)).await
    }

    /// Set the status of the order with this id.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UnknownOrder` if no order has this id, or
    /// `OrderError::Unavailable` if the orders cannot be loaded.
    #[instrument(skip(self))]
    pub async fn update_status_by_id(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), OrderError> {
        self.mutate(|orders| {
            let index = find(orders, id).ok_or(OrderError::UnknownOrder(id))?;
            set_status_at(orders, index, status)
        })
        .await?;
        tracing::info!(order_id = %id, %status, "Order status changed");
        Ok(())
    }

    /// Delete the order with this id.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UnknownOrder` if no order has this id, or
    /// `OrderError::Unavailable` if the orders cannot be loaded.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, id: OrderId) -> Result<Order, OrderError> {
        let removed = self
            .mutate(|orders| {
                let index = find(orders, id).ok_or(OrderError::UnknownOrder(id))?;
                remove_at(orders, index)
            })
            .await?;
        tracing::info!(order_id = %id, "Order deleted");
        Ok(removed)
    }

    /// Edit the order with this id.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::UnknownOrder` if no order has this id, or
    /// `OrderError::Unavailable` if the orders cannot be loaded.
    #[instrument(skip(self, patch))]
    pub async fn edit_by_id(&self, id: OrderId, patch: OrderPatch) -> Result<(), OrderError> {
        self.mutate(|orders| {
            let index = find(orders, id).ok_or(OrderError::UnknownOrder(id))?;
            edit_at(orders, index, patch)
        })
        .await?;
        tracing::info!(order_id = %id, "Order edited");
        Ok(())
    }

    /// Copy of the whole list, most recent first.
    pub async fn snapshot(&self) -> Vec<Order> {
        self.read(<[Order]>::to_vec).await
    }

    /// The order with this id.
    pub async fn get(&self, id: OrderId) -> Option<Order> {
        self.read(|orders| orders.iter().find(|o| o.id == id).cloned())
            .await
    }

    /// Orders with this status, in list order.
    pub async fn by_status(&self, status: OrderStatus) -> Vec<Order> {
        self.read(|orders| {
            orders
                .iter()
                .filter(|o| o.status == status)
                .cloned()
                .collect()
        })
        .await
    }

    /// Drop the in-memory list and read it again from the store.
    ///
    /// Pending saves are flushed first so the reload sees them. On failure
    /// the book is left unloaded.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Unavailable` if the store cannot be read.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<usize, OrderError> {
        let mut guard = self.inner.orders.write().await;
        self.inner.queue.flush().await;
        self.inner.store.invalidate().await;
        *guard = None;
        let count = self.ensure_loaded(&mut guard).await?.len();
        tracing::info!(count, "Reloaded orders from store");
        Ok(count)
    }
}

fn find(orders: &[Order], id: OrderId) -> Option<usize> {
    orders.iter().position(|o| o.id == id)
}

fn set_status_at(orders: &mut [Order], index: usize, status: OrderStatus) -> Result<(), OrderError> {
    let len = orders.len();
    let order = orders
        .get_mut(index)
        .ok_or(OrderError::StaleReference { index, len })?;
    order.status = status;
    Ok(())
}

fn remove_at(orders: &mut Vec<Order>, index: usize) -> Result<Order, OrderError> {
    if index >= orders.len() {
        return Err(OrderError::StaleReference {
            index,
            len: orders.len(),
        });
    }
    Ok(orders.remove(index))
}

fn edit_at(orders: &mut [Order], index: usize, patch: OrderPatch) -> Result<(), OrderError> {
    let len = orders.len();
    let order = orders
        .get_mut(index)
        .ok_or(OrderError::StaleReference { index, len })?;
    order.apply(patch);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;

    use super::*;
    use crate::notices::Notices;
    use crate::store::{MemoryStore, RecordStore, codec};
    use crate::test_support::order;

    /// Store over raw sheet rows, decoded with the sheet codec.
    struct RowStore {
        rows: Mutex<Vec<Vec<Value>>>,
    }

    impl RowStore {
        fn with_orders(orders: &[Order]) -> Self {
            let mut rows = vec![codec::header_row()];
            rows.extend(orders.iter().map(codec::order_to_row));
            Self {
                rows: Mutex::new(rows),
            }
        }
    }

    #[async_trait]
    impl RecordStore for RowStore {
        fn describe(&self) -> String {
            "row store".to_string()
        }

        async fn fetch(&self) -> Result<Vec<Order>, StoreError> {
            codec::decode_table(&self.rows.lock().await)
        }

        async fn replace_all(&self, orders: &[Order]) -> Result<(), StoreError> {
            *self.rows.lock().await = Self::with_orders(orders).rows.into_inner();
            Ok(())
        }
    }

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn book_on(store: Arc<dyn RecordStore>) -> OrderBook {
        let notices = Notices::new();
        let cached = CachedStore::new(store, Duration::from_secs(600), notices.clone());
        let queue = PersistQueue::spawn(cached.clone(), notices);
        OrderBook::with_clock(cached, queue, fixed_today)
    }

    fn book_over(store: &Arc<MemoryStore>) -> OrderBook {
        book_on(store.clone())
    }

    fn draft(name: &str) -> OrderDraft {
        let o = order(name, "0750000000");
        OrderDraft {
            name: o.name,
            phone: o.phone,
            city: o.city,
            region: o.region,
            kind: o.kind,
            price: o.price,
            quantity: o.quantity,
            notes: o.notes,
        }
    }

    fn seeded() -> (Arc<MemoryStore>, OrderBook) {
        let store = Arc::new(MemoryStore::with_orders(vec![
            order("A", "1"),
            order("B", "2"),
            order("C", "3"),
        ]));
        let book = book_over(&store);
        (store, book)
    }

    #[tokio::test]
    async fn test_lazy_load() {
        let (_store, book) = seeded();
        let names: Vec<_> = book.snapshot().await.into_iter().map(|o| o.name).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_insert_goes_first() {
        let (store, book) = seeded();
        let created = book.insert(draft("New")).await.unwrap();

        let orders = book.snapshot().await;
        assert_eq!(orders.len(), 4);
        assert_eq!(orders[0], created);
        assert_eq!(created.status, OrderStatus::Pending);
        assert_eq!(created.created_on, Some(fixed_today()));

        book.queue().flush().await;
        assert_eq!(store.orders().await, orders);
    }

    #[tokio::test]
    async fn test_update_status_sets_only_that_index() {
        let (_store, book) = seeded();
        let before = book.snapshot().await;

        book.update_status(1, OrderStatus::Delivered).await.unwrap();

        let after = book.snapshot().await;
        assert_eq!(after[1].status, OrderStatus::Delivered);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[2]);
    }

    #[tokio::test]
    async fn test_delete_shrinks_and_keeps_order() {
        let (_store, book) = seeded();
        let removed = book.delete(1).await.unwrap();
        assert_eq!(removed.name, "B");

        let names: Vec<_> = book.snapshot().await.into_iter().map(|o| o.name).collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[tokio::test]
    async fn test_stale_index_leaves_list_untouched() {
        let (store, book) = seeded();
        let before = book.snapshot().await;

        let err = book.update_status(3, OrderStatus::Completed).await.unwrap_err();
        assert!(matches!(err, OrderError::StaleReference { index: 3, len: 3 }));
        assert!(book.delete(7).await.is_err());
        assert!(book.edit(3, OrderPatch::default()).await.is_err());

        assert_eq!(book.snapshot().await, before);
        book.queue().flush().await;
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_merges_patch() {
        let (_store, book) = seeded();
        book.update_status(0, OrderStatus::Notification).await.unwrap();
        book.edit(
            0,
            OrderPatch {
                phone: Some("0771111111".to_string()),
                ..OrderPatch::default()
            },
        )
        .await
        .unwrap();

        let edited = &book.snapshot().await[0];
        assert_eq!(edited.phone, "0771111111");
        assert_eq!(edited.name, "A");
        assert_eq!(edited.status, OrderStatus::Notification);
    }

    #[tokio::test]
    async fn test_id_operations_follow_the_order() {
        let (_store, book) = seeded();
        let c = book.snapshot().await[2].id;

        book.delete(0).await.unwrap();
        assert_eq!(book.position(c).await, Some(1));

        book.update_status_by_id(c, OrderStatus::Completed).await.unwrap();
        assert_eq!(book.get(c).await.unwrap().status, OrderStatus::Completed);
        assert_eq!(book.by_status(OrderStatus::Completed).await.len(), 1);

        book.delete_by_id(c).await.unwrap();
        assert_eq!(book.position(c).await, None);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let (_store, book) = seeded();
        let missing = OrderId::new();
        assert!(matches!(
            book.delete_by_id(missing).await,
            Err(OrderError::UnknownOrder(id)) if id == missing
        ));
        assert!(matches!(
            book.edit_by_id(missing, OrderPatch::default()).await,
            Err(OrderError::UnknownOrder(_))
        ));
        assert_eq!(book.snapshot().await.len(), 3);
    }

    #[tokio::test]
    async fn test_deleting_last_order_does_not_clear_store() {
        let store = Arc::new(MemoryStore::with_orders(vec![order("Only", "1")]));
        let book = book_over(&store);

        book.delete(0).await.unwrap();
        book.queue().flush().await;

        assert!(book.snapshot().await.is_empty());
        assert_eq!(store.orders().await.len(), 1);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_reload_flushes_pending_saves() {
        let (store, book) = seeded();
        book.insert(draft("New")).await.unwrap();

        assert_eq!(book.reload().await.unwrap(), 4);
        assert_eq!(store.orders().await.len(), 4);
    }

    #[tokio::test]
    async fn test_reload_sees_store_changes() {
        let (store, book) = seeded();
        assert_eq!(book.snapshot().await.len(), 3);

        store.set_orders(vec![order("Z", "9")]).await;
        assert_eq!(book.snapshot().await.len(), 3, "served from memory");

        assert_eq!(book.reload().await.unwrap(), 1);
        assert_eq!(book.snapshot().await[0].name, "Z");
    }

    #[tokio::test]
    async fn test_failed_load_refuses_mutations_then_retries() {
        let (store, book) = seeded();
        store.set_failing(true);

        assert!(book.snapshot().await.is_empty());
        assert!(matches!(
            book.insert(draft("New")).await,
            Err(OrderError::Unavailable(_))
        ));
        assert!(matches!(
            book.update_status(0, OrderStatus::Delivered).await,
            Err(OrderError::Unavailable(_))
        ));
        book.queue().flush().await;
        assert_eq!(book.queue().status().enqueued, 0);

        store.set_failing(false);
        assert_eq!(book.snapshot().await.len(), 3, "next access loads again");

        book.insert(draft("New")).await.unwrap();
        book.queue().flush().await;
        let names: Vec<_> = store.orders().await.into_iter().map(|o| o.name).collect();
        assert_eq!(names, ["New", "A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_failed_reload_leaves_book_unloaded() {
        let (store, book) = seeded();
        assert_eq!(book.snapshot().await.len(), 3);

        store.set_failing(true);
        assert!(matches!(book.reload().await, Err(OrderError::Unavailable(_))));
        assert!(book.delete(0).await.is_err());

        store.set_failing(false);
        assert_eq!(book.snapshot().await.len(), 3);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_row_leaves_table_untouched() {
        let store = Arc::new(RowStore::with_orders(&[
            order("A", "1"),
            order("B", "2"),
            order("C", "3"),
        ]));
        store.rows.lock().await[2][8] = json!("Shipped");
        let before = store.rows.lock().await.clone();
        let book = book_on(store.clone());

        assert!(matches!(
            book.insert(draft("New")).await,
            Err(OrderError::Unavailable(StoreError::Decode { row: 3, .. }))
        ));
        book.queue().flush().await;

        assert_eq!(*store.rows.lock().await, before);
    }

    #[tokio::test]
    async fn test_price_above_intake_maximum_survives_insert() {
        let store = Arc::new(RowStore::with_orders(&[
            order("A", "1"),
            order("B", "2"),
            order("C", "3"),
        ]));
        store.rows.lock().await[1][5] = json!("600000");
        let book = book_on(store.clone());

        book.insert(draft("New")).await.unwrap();
        book.queue().flush().await;

        let stored = store.fetch().await.unwrap();
        assert_eq!(stored.len(), 4);
        assert_eq!(stored[1].price.amount(), rust_decimal::Decimal::new(600_000, 0));
    }
}
