//! Login and logout.
//!
//! Users sign in with a username and a plaintext access code checked against
//! the registry. The browser's `User-Agent` is recorded as the device.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, header::USER_AGENT},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::set_current_user;
use crate::models::{CurrentUser, Flash};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub code: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub flashes: Vec<Flash>,
}

/// Display the login page.
pub async fn login_page(session: Session) -> impl IntoResponse {
    LoginTemplate {
        flashes: Flash::take_all(&session).await,
    }
}

/// Handle login form submission.
#[instrument(skip_all, fields(username = %form.username.trim()))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();

    let Some(auth) = state.registry().authenticate(username, &form.code).await else {
        tracing::warn!("Login failed");
        Flash::error("Invalid username or code").push(&session).await;
        return Ok(Redirect::to("/auth/login").into_response());
    };

    // New session id on privilege change
    session.cycle_id().await?;

    let user = CurrentUser {
        username: username.to_string(),
        is_manager: auth.is_manager,
    };
    set_current_user(&session, &user).await?;

    let device = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if let Err(e) = state.registry().record_device(username, device).await {
        tracing::warn!(error = %e, "Failed to record login device");
    }

    set_sentry_user(username);
    tracing::info!(is_manager = auth.is_manager, "Login successful");
    Flash::success("Login successful").push(&session).await;

    Ok(Redirect::to("/").into_response())
}

/// Handle logout.
pub async fn logout(session: Session) -> Result<Response, AppError> {
    session.flush().await?;
    clear_sentry_user();

    Flash::info("You have been logged out").push(&session).await;
    Ok(Redirect::to("/auth/login").into_response())
}
