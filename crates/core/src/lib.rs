//! Order Desk Core - Shared domain types.
//!
//! This crate provides the types used across all Order Desk components:
//! - `dashboard` - The authenticated order-management web UI
//! - `cli` - Command-line tools for registry and store management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no file access. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Order records, statuses, cities, product kinds, pages and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
