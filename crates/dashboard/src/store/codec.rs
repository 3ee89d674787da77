//! Row codec between [`Order`] and spreadsheet rows.
//!
//! The table's first row is a header of column keys; every following row is
//! one order. Column keys are the legacy ones the sheet has always used
//! (`hello` for the customer name, `number` for the price and so on), with
//! the stable `id` column last so older sheets keep their column positions.

use std::collections::HashMap;

use chrono::NaiveDate;
use order_desk_core::{
    City, Order, OrderId, OrderStatus, ProductKind, parse_stored_price, parse_stored_quantity,
};
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use super::StoreError;

/// Column keys in record field order.
pub const HEADER: [&str; 11] = [
    "hello", "phone", "city", "region", "more", "number", "kind", "total", "status", "date", "id",
];

/// Date format used in the `date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The header row as cell values.
#[must_use]
pub fn header_row() -> Vec<Value> {
    HEADER.iter().map(|key| Value::from(*key)).collect()
}

/// Encode one order as a row, in [`HEADER`] order.
#[must_use]
pub fn order_to_row(order: &Order) -> Vec<Value> {
    let amount = order.price.amount();
    // Whole prices go in as numbers so the sheet can sum them.
    let price = match amount.to_i64() {
        Some(whole) if amount.fract().is_zero() => Value::from(whole),
        _ => Value::from(amount.to_string()),
    };

    vec![
        Value::from(order.name.as_str()),
        Value::from(order.phone.as_str()),
        Value::from(order.city.label()),
        Value::from(order.region.as_str()),
        Value::from(order.notes.as_str()),
        price,
        Value::from(order.kind.label()),
        Value::from(order.quantity),
        Value::from(order.status.as_str()),
        Value::from(
            order
                .created_on
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
        ),
        Value::from(order.id.to_string()),
    ]
}

/// Decode a whole table (header row first) into orders.
///
/// An empty table, or one with only a header, decodes to no orders.
///
/// # Errors
///
/// Returns `StoreError::Decode` for the first row that cannot be decoded.
pub fn decode_table(rows: &[Vec<Value>]) -> Result<Vec<Order>, StoreError> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(cell_text).collect();

    body.iter()
        .enumerate()
        .filter(|(_, cells)| !cells.iter().all(|c| cell_text(c).trim().is_empty()))
        // Row 1 is the header.
        .map(|(i, cells)| row_to_order(&header, cells, i + 2))
        .collect()
}

/// Decode one row given the table header.
///
/// Cells missing from the end of the row read as empty. A missing or
/// unreadable date decodes to `None`; a missing id gets a fresh one. Prices
/// and quantities above the intake maxima are kept as stored.
///
/// # Errors
///
/// Returns `StoreError::Decode` naming the row and column.
pub fn row_to_order(header: &[String], cells: &[Value], row: usize) -> Result<Order, StoreError> {
    let fields: HashMap<&str, String> = header
        .iter()
        .zip(cells.iter().map(cell_text).chain(std::iter::repeat(String::new())))
        .map(|(key, value)| (key.as_str(), value))
        .collect();
    let get = |column: &str| fields.get(column).map_or("", String::as_str).trim();
    let fail = |column: &str, message: String| StoreError::Decode {
        row,
        column: column.to_string(),
        message,
    };

    let status = match get("status") {
        "" => OrderStatus::default(),
        raw => raw
            .parse::<OrderStatus>()
            .map_err(|e| fail("status", e.to_string()))?,
    };
    let city = get("city")
        .parse::<City>()
        .map_err(|e| fail("city", e.to_string()))?;
    let kind = get("kind")
        .parse::<ProductKind>()
        .map_err(|e| fail("kind", e.to_string()))?;
    // Intake maxima do not apply to rows already in the table.
    let price = parse_stored_price(get("number")).map_err(|e| fail("number", e.to_string()))?;
    let quantity =
        parse_stored_quantity(get("total")).map_err(|e| fail("total", e.to_string()))?;
    let id = match get("id") {
        "" => OrderId::new(),
        raw => raw
            .parse::<OrderId>()
            .map_err(|e| fail("id", e.to_string()))?,
    };

    Ok(Order {
        id,
        name: get("hello").to_string(),
        phone: get("phone").to_string(),
        city,
        region: get("region").to_string(),
        kind,
        price,
        quantity,
        notes: get("more").to_string(),
        status,
        created_on: NaiveDate::parse_from_str(get("date"), DATE_FORMAT).ok(),
    })
}

/// Plain text of a cell, whether the API returned it as a string or a number.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
