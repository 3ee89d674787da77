//! Subcommand implementations.

pub mod orders;
pub mod users;
