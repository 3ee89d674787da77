//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                           - Liveness check
//! GET  /health/ready                     - Readiness check (registry readable)
//! GET  /                                 - Redirect to first permitted page
//!
//! # Auth
//! GET  /auth/login                       - Login page
//! POST /auth/login                       - Login action
//! POST /auth/logout                      - Logout action
//!
//! # Home [Home]
//! GET  /home                             - Intake form
//! POST /home                             - Record an order
//!
//! # Orders [Orders]
//! GET  /orders?tab=                      - Orders by status tab
//! POST /orders/refresh                   - Reload from the record store
//! POST /orders/{id}/status               - Set status
//! POST /orders/{id}/delete               - Delete
//! GET  /orders/{id}/edit                 - Edit form
//! POST /orders/{id}/edit                 - Apply edit
//!
//! # Search [Search]
//! GET  /search?q=                        - Search by name or phone
//!
//! # Dashboard [Dashboard]
//! GET  /dashboard                        - Sales analytics
//!
//! # Settings [Settings]
//! GET  /settings?section=                - Settings sections
//! POST /settings/users                   - Add user
//! POST /settings/permissions             - Replace a user's permissions
//! POST /settings/devices/{user}/logout   - Forget a user's devices
//! POST /settings/password                - Change own access code
//! POST /settings/users/{user}/delete     - Delete user
//! ```
//!
//! Mutating handlers follow Post/Redirect/Get: they record the outcome as a
//! flash message and redirect back to the page that sent the form.

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod home;
pub mod orders;
pub mod search;
pub mod settings;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use order_desk_core::Page;
use tower_sessions::Session;

use crate::filters;
use crate::middleware::RequireUser;
use crate::models::{CurrentUser, Flash};
use crate::notices::Notice;
use crate::state::AppState;

/// One entry of the navigation menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
    pub active: bool,
}

/// Data every authenticated page renders around its content.
#[derive(Debug, Clone)]
pub struct Layout {
    pub username: String,
    pub is_manager: bool,
    /// Permitted pages only, in menu order.
    pub nav: Vec<NavItem>,
    pub flashes: Vec<Flash>,
    /// Record store warnings raised since the last render.
    pub notices: Vec<Notice>,
    /// Saves still waiting for the record store.
    pub pending_saves: u64,
}

impl Layout {
    /// Gather the layout for `user` on page `active`.
    ///
    /// Consumes the session's pending flashes and the shared notices.
    pub async fn load(state: &AppState, session: &Session, user: &CurrentUser, active: Page) -> Self {
        let nav = state
            .registry()
            .permitted_pages(&user.username)
            .await
            .into_iter()
            .map(|page| NavItem {
                label: page.as_str(),
                path: page.path(),
                active: page == active,
            })
            .collect();

        Self {
            username: user.username.clone(),
            is_manager: user.is_manager,
            nav,
            flashes: Flash::take_all(session).await,
            notices: state.notices().drain(),
            pending_saves: state.orders().queue().status().pending(),
        }
    }
}

/// Shown to a user who has no page permissions at all.
#[derive(Template, WebTemplate)]
#[template(path = "no_access.html")]
pub struct NoAccessTemplate {
    pub username: String,
}

/// Send the user to the first page they may open.
pub async fn index(State(state): State<AppState>, RequireUser(user): RequireUser) -> Response {
    match state.registry().permitted_pages(&user.username).await.first() {
        Some(page) => Redirect::to(page.path()).into_response(),
        None => NoAccessTemplate {
            username: user.username,
        }
        .into_response(),
    }
}

/// A local path to redirect back to, or `fallback`.
///
/// Only same-site absolute paths are accepted.
#[must_use]
pub fn return_path(back: Option<&str>, fallback: &str) -> String {
    match back {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/refresh", post(orders::refresh))
        .route("/{id}/status", post(orders::set_status))
        .route("/{id}/delete", post(orders::delete))
        .route("/{id}/edit", get(orders::edit_page).post(orders::edit))
}

/// Create the settings routes router.
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(settings::index))
        .route("/users", post(settings::add_user))
        .route("/permissions", post(settings::update_permissions))
        .route("/devices/{user}/logout", post(settings::logout_devices))
        .route("/password", post(settings::change_password))
        .route("/users/{user}/delete", post(settings::delete_user))
}

/// Create all page routes for the dashboard.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/", get(index))
        .nest("/auth", auth_routes())
        .route("/home", get(home::index).post(home::create))
        .nest("/orders", order_routes())
        .route("/search", get(search::index))
        .route("/dashboard", get(dashboard::index))
        .nest("/settings", settings_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_path_accepts_local_paths() {
        assert_eq!(return_path(Some("/orders?tab=delivered"), "/"), "/orders?tab=delivered");
        assert_eq!(return_path(Some("/search?q=ali"), "/"), "/search?q=ali");
    }

    #[test]
    fn test_return_path_rejects_offsite_targets() {
        assert_eq!(return_path(Some("https://evil.example"), "/orders"), "/orders");
        assert_eq!(return_path(Some("//evil.example"), "/orders"), "/orders");
        assert_eq!(return_path(Some("/\\evil.example"), "/orders"), "/orders");
        assert_eq!(return_path(None, "/orders"), "/orders");
    }
}
