//! Order intake.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use order_desk_core::{City, NewOrder, Page, ProductKind};
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{HomePage, RequirePage};
use crate::models::Flash;
use crate::routes::Layout;
use crate::state::AppState;

/// Intake form template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub cities: &'static [City],
    pub kinds: &'static [ProductKind],
}

/// Display the intake form.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<HomePage>,
) -> impl IntoResponse {
    HomeTemplate {
        layout: Layout::load(&state, &session, &user, Page::Home).await,
        cities: &City::ALL,
        kinds: &ProductKind::ALL,
    }
}

/// Record a new order from the intake form.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<HomePage>,
    Form(form): Form<NewOrder>,
) -> Response {
    let flash = match form.validate() {
        Ok(draft) => match state.orders().insert(draft).await {
            Ok(order) => Flash::success(format!("Order for {} recorded", order.name)),
            Err(e) => Flash::error(format!("Order not recorded: {e}")),
        },
        Err(e) => {
            tracing::info!(error = %e, "Intake rejected");
            Flash::error(format!("Order not recorded: {e}"))
        }
    };
    flash.push(&session).await;

    Redirect::to(Page::Home.path()).into_response()
}
