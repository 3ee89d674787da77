//! User management pages.
//!
//! Every user granted the Settings page may manage every account; the only
//! account that cannot be deleted is `admin`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use order_desk_core::Page;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::access::{ADMIN_USERNAME, AccessError};
use crate::error::{AppError, clear_sentry_user};
use crate::filters;
use crate::middleware::{RequirePage, SettingsPage};
use crate::models::Flash;
use crate::routes::Layout;
use crate::state::AppState;

/// Sub-pages of the settings page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Users,
    Permissions,
    Devices,
    Password,
    Delete,
}

impl Section {
    pub const ALL: [Self; 5] = [
        Self::Users,
        Self::Permissions,
        Self::Devices,
        Self::Password,
        Self::Delete,
    ];

    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Permissions => "permissions",
            Self::Devices => "devices",
            Self::Password => "password",
            Self::Delete => "delete",
        }
    }

    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Users => "User Management",
            Self::Permissions => "Permissions",
            Self::Devices => "Connected Devices",
            Self::Password => "Change Password",
            Self::Delete => "Delete User",
        }
    }

    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.slug() == slug)
    }

    fn path(self) -> String {
        format!("{}?section={}", Page::Settings.path(), self.slug())
    }
}

/// A registry user as shown on the settings page.
#[derive(Debug, Clone)]
pub struct UserView {
    pub name: String,
    pub is_manager: bool,
    pub devices: Vec<String>,
    pub pages: Vec<Page>,
    pub is_self: bool,
    pub protected: bool,
}

impl UserView {
    /// Whether `page` is granted.
    #[must_use]
    pub fn grants(&self, page: &Page) -> bool {
        self.pages.contains(page)
    }
}

/// Query parameters for the settings page.
#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    pub section: Option<String>,
    /// User selected in the permissions section.
    pub user: Option<String>,
}

/// Change password form data.
#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current: String,
    pub new: String,
    pub confirm: String,
}

/// Settings page template.
#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub layout: Layout,
    pub section: Section,
    pub sections: &'static [Section],
    pub users: Vec<UserView>,
    /// User whose permissions are being edited.
    pub selected: Option<UserView>,
    pub pages: &'static [Page],
    pub default_grants: &'static [Page],
}

impl SettingsTemplate {
    /// Whether a new user gets `page` unless told otherwise.
    #[must_use]
    pub fn granted_by_default(&self, page: &Page) -> bool {
        self.default_grants.contains(page)
    }
}

/// Value of the first form field called `name`.
fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Every page ticked in a form (repeated `page` fields), in menu order.
fn ticked_pages(fields: &[(String, String)]) -> Vec<Page> {
    Page::ALL
        .into_iter()
        .filter(|page| {
            fields
                .iter()
                .any(|(key, value)| key == "page" && value.parse::<Page>().ok() == Some(*page))
        })
        .collect()
}

/// Display one settings section.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<SettingsPage>,
    Query(query): Query<SettingsQuery>,
) -> impl IntoResponse {
    let section = query
        .section
        .as_deref()
        .and_then(Section::from_slug)
        .unwrap_or_default();

    let users: Vec<UserView> = state
        .registry()
        .users()
        .await
        .into_iter()
        .map(|(name, record)| UserView {
            is_self: name == user.username,
            protected: name == ADMIN_USERNAME,
            is_manager: record.is_manager,
            pages: record.permitted_pages(),
            devices: record.devices,
            name,
        })
        .collect();

    let selected = query
        .user
        .as_deref()
        .and_then(|name| users.iter().find(|u| u.name == name))
        .or_else(|| users.first())
        .cloned();

    SettingsTemplate {
        layout: Layout::load(&state, &session, &user, Page::Settings).await,
        section,
        sections: &Section::ALL,
        users,
        selected,
        pages: &Page::ALL,
        default_grants: &Page::DEFAULT_GRANTS,
    }
}

/// Log the session out when the acting user removed their own access.
async fn end_own_session(session: &Session, message: String) -> Result<Response, AppError> {
    session.flush().await?;
    clear_sentry_user();
    Flash::info(message).push(session).await;
    Ok(Redirect::to("/auth/login").into_response())
}

/// Add a user.
///
/// Form fields: `username`, `code`, optional `is_manager`, and one `page`
/// field per granted page.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn add_user(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<SettingsPage>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let new_user = field(&fields, "username").unwrap_or_default();
    let code = field(&fields, "code").unwrap_or_default();
    let is_manager = field(&fields, "is_manager").is_some();
    let pages = ticked_pages(&fields);

    let flash = match state
        .registry()
        .add_user(new_user, code, is_manager, &pages)
        .await
    {
        Ok(()) => Flash::success(format!("User {} added successfully!", new_user.trim())),
        Err(AccessError::EmptyField(_)) => {
            Flash::error("Please enter a username and access code.")
        }
        Err(e) => Flash::error(e.to_string()),
    };
    flash.push(&session).await;

    Redirect::to(&Section::Users.path()).into_response()
}

/// Replace a user's permissions with the ticked pages.
///
/// Form fields: `username` and one `page` field per granted page.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn update_permissions(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<SettingsPage>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let target = field(&fields, "username").unwrap_or_default();
    let pages = ticked_pages(&fields);

    let flash = match state.registry().update_permissions(target, &pages).await {
        Ok(()) => Flash::success(format!("Permissions updated for {target}")),
        Err(e) => Flash::error(e.to_string()),
    };
    flash.push(&session).await;

    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    Redirect::to(&format!("{}&user={encoded}", Section::Permissions.path())).into_response()
}

/// Forget every device recorded for a user.
///
/// Advisory only: other sessions of that user stay valid. When users log
/// themselves out this way their own session ends too.
#[instrument(skip_all, fields(username = %user.username, target = %target))]
pub async fn logout_devices(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<SettingsPage>,
    Path(target): Path<String>,
) -> Result<Response, AppError> {
    let flash = match state.registry().logout_devices(&target).await {
        Ok(()) if target == user.username => {
            return end_own_session(
                &session,
                format!("{target} has been logged out from all devices."),
            )
            .await;
        }
        Ok(()) => Flash::success(format!("{target} has been logged out from all devices.")),
        Err(e) => Flash::error(e.to_string()),
    };
    flash.push(&session).await;

    Ok(Redirect::to(&Section::Devices.path()).into_response())
}

/// Change the acting user's own access code.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn change_password(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<SettingsPage>,
    Form(form): Form<PasswordForm>,
) -> Response {
    let flash = match state
        .registry()
        .change_password(&user.username, &form.current, &form.new, &form.confirm)
        .await
    {
        Ok(()) => Flash::success("Password changed successfully!"),
        Err(e) => Flash::error(e.to_string()),
    };
    flash.push(&session).await;

    Redirect::to(&Section::Password.path()).into_response()
}

/// Delete a user.
#[instrument(skip_all, fields(username = %user.username, target = %target))]
pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<SettingsPage>,
    Path(target): Path<String>,
) -> Result<Response, AppError> {
    let flash = match state.registry().delete_user(&target).await {
        Ok(()) if target == user.username => {
            return end_own_session(&session, format!("User {target} deleted successfully!")).await;
        }
        Ok(()) => Flash::success(format!("User {target} deleted successfully!")),
        Err(e) => Flash::error(e.to_string()),
    };
    flash.push(&session).await;

    Ok(Redirect::to(&Section::Delete.path()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_ticked_pages_in_menu_order() {
        let fields = pairs(&[
            ("username", "sara"),
            ("page", "Search"),
            ("page", "Home"),
            ("page", "Bogus"),
        ]);
        assert_eq!(ticked_pages(&fields), vec![Page::Home, Page::Search]);
        assert_eq!(field(&fields, "username"), Some("sara"));
        assert_eq!(field(&fields, "code"), None);
    }

    #[test]
    fn test_section_slugs() {
        for section in Section::ALL {
            assert_eq!(Section::from_slug(section.slug()), Some(section));
        }
        assert_eq!(Section::from_slug("nope"), None);
        assert_eq!(Section::default().path(), "/settings?section=users");
    }
}
