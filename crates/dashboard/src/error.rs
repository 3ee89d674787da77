//! Unified error handling for the dashboard.
//!
//! Most handlers report domain failures as flash messages and redirect.
//! `AppError` covers the failures that cannot be shown that way: a page for
//! an order that does not exist, or a session that can no longer be written.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::orders::OrderError;

/// Application-level error type for the dashboard.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order book operation failed.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// Session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Order(OrderError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Order(OrderError::UnknownOrder(_)) => StatusCode::NOT_FOUND,
            Self::Order(OrderError::StaleReference { .. }) => StatusCode::CONFLICT,
            Self::Order(OrderError::Validation(_)) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Dashboard request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match status {
            StatusCode::SERVICE_UNAVAILABLE => "Record store unavailable".to_string(),
            _ if status.is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Tag Sentry events from this request scope with the dashboard username.
pub fn set_sentry_user(username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
