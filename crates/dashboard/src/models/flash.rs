//! One-shot messages carried across a redirect.
//!
//! Handlers push a flash before redirecting; the next page render takes and
//! shows every pending flash.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::keys;

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

impl FlashLevel {
    /// CSS class suffix.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A message shown once on the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    /// Queue this flash in the session.
    ///
    /// Session failures are logged and otherwise ignored; losing a flash
    /// never fails the request.
    pub async fn push(self, session: &Session) {
        let mut pending: Vec<Self> = session
            .get(keys::FLASH)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        pending.push(self);

        if let Err(e) = session.insert(keys::FLASH, pending).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Remove and return every pending flash.
    pub async fn take_all(session: &Session) -> Vec<Self> {
        match session.remove::<Vec<Self>>(keys::FLASH).await {
            Ok(pending) => pending.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read flash messages");
                Vec::new()
            }
        }
    }
}
