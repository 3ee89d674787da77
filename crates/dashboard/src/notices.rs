//! Process-wide notice board for background failures.
//!
//! Record store failures happen away from any request (the first lazy load,
//! or a background save). They are logged, and also posted here so the next
//! page render can show them as a transient warning.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

/// Maximum notices kept before the oldest are dropped.
const MAX_NOTICES: usize = 20;

/// A single warning posted by a background component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Human-readable message.
    pub message: String,
    /// When the notice was posted.
    pub at: DateTime<Utc>,
}

/// Shared, cheaply cloneable notice board.
#[derive(Debug, Clone, Default)]
pub struct Notices {
    inner: Arc<Mutex<VecDeque<Notice>>>,
}

impl Notices {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a warning.
    ///
    /// A message equal to the newest pending one only refreshes its time.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        let mut queue = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = queue.back_mut().filter(|last| last.message == message) {
            last.at = Utc::now();
            return;
        }
        if queue.len() == MAX_NOTICES {
            queue.pop_front();
        }
        queue.push_back(Notice {
            message,
            at: Utc::now(),
        });
    }

    /// Take every pending notice, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Notice> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Number of pending notices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether there are no pending notices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
