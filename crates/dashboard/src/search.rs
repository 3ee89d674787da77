//! Order search.

use order_desk_core::Order;

/// Orders whose name or phone contains `query`, ignoring case.
///
/// The query is trimmed first; an empty query matches nothing.
#[must_use]
pub fn search(orders: &[Order], query: &str) -> Vec<Order> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    orders
        .iter()
        .filter(|o| o.name.to_lowercase().contains(&needle) || o.phone.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
