//! Session-related types for dashboard authentication.

use serde::{Deserialize, Serialize};

/// Session-stored user identity.
///
/// Only the name is authoritative; everything else is re-read from the
/// registry on each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Registry username.
    pub username: String,
    /// Whether the user is a manager.
    pub is_manager: bool,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";
}
