//! Sales aggregates for the dashboard page.
//!
//! Revenue counts the unit price of Delivered orders only; quantity is not
//! multiplied in. Orders without a creation date still count towards the
//! totals but are left out of the per-date series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use order_desk_core::{City, Order, OrderStatus};
use rust_decimal::Decimal;

/// Progress ring maximum for all orders.
pub const TOTAL_GAUGE_MAX: usize = 1500;
/// Progress ring maximum for pending orders.
pub const PENDING_GAUGE_MAX: usize = 150;
/// Progress ring maximum for completed orders.
pub const COMPLETED_GAUGE_MAX: usize = 150;
/// Progress ring maximum for delivered orders.
pub const DELIVERED_GAUGE_MAX: usize = 1000;

/// Order count for one city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityCount {
    pub city: City,
    pub count: usize,
}

/// Delivered revenue for one city.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityRevenue {
    pub city: City,
    pub revenue: Decimal,
}

/// Order count for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Delivered revenue for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
}

/// A progress ring value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gauge {
    pub label: &'static str,
    pub value: usize,
    pub max: usize,
    /// `value / max` as a whole percentage, clamped to `0..=100`.
    pub percent: u8,
}

impl Gauge {
    /// Build a gauge. A zero `max` reads as 0%.
    #[must_use]
    pub fn new(label: &'static str, value: usize, max: usize) -> Self {
        let percent = if max == 0 {
            0
        } else {
            u8::try_from((value.saturating_mul(100) / max).min(100)).unwrap_or(100)
        };
        Self {
            label,
            value,
            max,
            percent,
        }
    }
}

/// Aggregates over an order list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub delivered: usize,
    pub notification: usize,
    pub total_revenue: Decimal,
    /// All orders per city, by city label.
    pub orders_by_city: Vec<CityCount>,
    /// Delivered revenue per city, by city label.
    pub revenue_by_city: Vec<CityRevenue>,
    /// Dated orders per day, ascending.
    pub orders_by_date: Vec<DateCount>,
    /// Delivered revenue per day, ascending.
    pub revenue_by_date: Vec<DateRevenue>,
}

impl Summary {
    /// The four progress rings shown at the top of the dashboard.
    #[must_use]
    pub fn gauges(&self) -> [Gauge; 4] {
        [
            Gauge::new("Total orders", self.total, TOTAL_GAUGE_MAX),
            Gauge::new("Pending", self.pending, PENDING_GAUGE_MAX),
            Gauge::new("Completed", self.completed, COMPLETED_GAUGE_MAX),
            Gauge::new("Delivered", self.delivered, DELIVERED_GAUGE_MAX),
        ]
    }
}

#[derive(Default)]
struct Bucket {
    count: usize,
    delivered: usize,
    revenue: Decimal,
}

impl Bucket {
    fn add(&mut self, order: &Order, delivered: bool) {
        self.count += 1;
        if delivered {
            self.delivered += 1;
            self.revenue += order.price.amount();
        }
    }
}

/// Compute every aggregate in one pass.
#[must_use]
pub fn summarize(orders: &[Order]) -> Summary {
    let mut summary = Summary {
        total: orders.len(),
        ..Summary::default()
    };
    let mut by_city: BTreeMap<&'static str, (City, Bucket)> = BTreeMap::new();
    let mut by_date: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();

    for order in orders {
        let delivered = order.status == OrderStatus::Delivered;
        match order.status {
            OrderStatus::Pending => summary.pending += 1,
            OrderStatus::Completed => summary.completed += 1,
            OrderStatus::Delivered => summary.delivered += 1,
            OrderStatus::Notification => summary.notification += 1,
        }
        if delivered {
            summary.total_revenue += order.price.amount();
        }

        by_city
            .entry(order.city.label())
            .or_insert_with(|| (order.city, Bucket::default()))
            .1
            .add(order, delivered);
        if let Some(date) = order.created_on {
            by_date.entry(date).or_default().add(order, delivered);
        }
    }

    for (city, bucket) in by_city.into_values() {
        summary.orders_by_city.push(CityCount {
            city,
            count: bucket.count,
        });
        if bucket.delivered > 0 {
            summary.revenue_by_city.push(CityRevenue {
                city,
                revenue: bucket.revenue,
            });
        }
    }
    for (date, bucket) in by_date {
        summary.orders_by_date.push(DateCount {
            date,
            count: bucket.count,
        });
        if bucket.delivered > 0 {
            summary.revenue_by_date.push(DateRevenue {
                date,
                revenue: bucket.revenue,
            });
        }
    }

    summary
}
