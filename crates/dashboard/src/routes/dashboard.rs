//! Sales analytics page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use order_desk_core::Page;
use tower_sessions::Session;

use crate::analytics::{Gauge, Summary, summarize};
use crate::filters;
use crate::middleware::{DashboardPage, RequirePage};
use crate::routes::Layout;
use crate::state::AppState;

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub summary: Summary,
    pub gauges: [Gauge; 4],
}

/// Display aggregates over every order.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<DashboardPage>,
) -> impl IntoResponse {
    let summary = summarize(&state.orders().snapshot().await);

    DashboardTemplate {
        layout: Layout::load(&state, &session, &user, Page::Dashboard).await,
        gauges: summary.gauges(),
        summary,
    }
}
