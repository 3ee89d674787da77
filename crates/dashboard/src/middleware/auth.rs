//! Authentication and page-permission extractors.
//!
//! The session only remembers who logged in. Every request looks the user up
//! in the registry again, so a deleted user is logged out on their next
//! request and permission changes apply immediately.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use order_desk_core::Page;
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user who still exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Error returned when a request is not allowed through.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Not logged in.
    RedirectToLogin,
    /// No session layer in front of the handler.
    Unauthorized,
    /// Logged in but the page is not granted.
    Forbidden(Page),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden(page) => (
                StatusCode::FORBIDDEN,
                format!("You do not have access to the {page} page"),
            )
                .into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let stored: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(AuthRejection::RedirectToLogin)?;

        let Some(record) = state.registry().user(&stored.username).await else {
            tracing::info!(username = %stored.username, "Session user no longer exists");
            if let Err(e) = clear_current_user(&session).await {
                tracing::warn!(error = %e, "Failed to clear stale session");
            }
            return Err(AuthRejection::RedirectToLogin);
        };

        Ok(Self(CurrentUser {
            username: stored.username,
            is_manager: record.is_manager,
        }))
    }
}

/// A page that needs its own permission.
pub trait PageGuard {
    const PAGE: Page;
}

/// Marker for [`Page::Home`].
pub struct HomePage;
/// Marker for [`Page::Orders`].
pub struct OrdersPage;
/// Marker for [`Page::Search`].
pub struct SearchPage;
/// Marker for [`Page::Dashboard`].
pub struct DashboardPage;
/// Marker for [`Page::Settings`].
pub struct SettingsPage;

impl PageGuard for HomePage {
    const PAGE: Page = Page::Home;
}
impl PageGuard for OrdersPage {
    const PAGE: Page = Page::Orders;
}
impl PageGuard for SearchPage {
    const PAGE: Page = Page::Search;
}
impl PageGuard for DashboardPage {
    const PAGE: Page = Page::Dashboard;
}
impl PageGuard for SettingsPage {
    const PAGE: Page = Page::Settings;
}

/// Extractor that requires a logged-in user granted page `P`.
///
/// Not logged in redirects to the login page; logged in without the
/// permission is `403 Forbidden`.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequirePage(user, ..): RequirePage<OrdersPage>) -> impl IntoResponse {
///     format!("{} may see orders", user.username)
/// }
/// ```
pub struct RequirePage<P>(pub CurrentUser, pub PhantomData<P>);

impl<P> FromRequestParts<AppState> for RequirePage<P>
where
    P: PageGuard + Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;

        if !state.registry().permission(&user.username, P::PAGE).await {
            tracing::info!(username = %user.username, page = %P::PAGE, "Page access denied");
            return Err(AuthRejection::Forbidden(P::PAGE));
        }

        Ok(Self(user, PhantomData))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
