//! Core types for Order Desk.
//!
//! This module provides type-safe wrappers for the order domain.

pub mod city;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;

pub use city::{City, UnknownCity};
pub use id::OrderId;
pub use order::{
    NewOrder, Order, OrderDraft, OrderPatch, ValidationError, parse_price, parse_quantity,
    parse_stored_price, parse_stored_quantity,
};
pub use price::{MAX_PRICE, MAX_QUANTITY, Price, format_thousands};
pub use product::{ProductKind, UnknownProductKind};
pub use status::{OrderStatus, Page, UnknownPage, UnknownStatus};
