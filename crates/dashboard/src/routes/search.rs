//! Order search page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use order_desk_core::{Order, OrderStatus, Page};
use serde::Deserialize;
use tower_sessions::Session;

use crate::filters;
use crate::middleware::{RequirePage, SearchPage};
use crate::routes::Layout;
use crate::routes::orders::{OrderRow, RowAction};
use crate::search::search;
use crate::state::AppState;

/// Query parameters for the search page.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search page template.
#[derive(Template, WebTemplate)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub layout: Layout,
    pub query: String,
    /// Whether a non-blank query was submitted.
    pub searched: bool,
    pub rows: Vec<OrderRow>,
    pub back: String,
}

/// Actions offered on a search hit.
#[must_use]
pub fn search_actions(order: &Order) -> Vec<RowAction> {
    vec![
        RowAction::SetStatus(order.status.toggled()),
        RowAction::SetStatus(OrderStatus::Delivered),
        RowAction::Delete,
    ]
}

/// Display the search form and any results.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<SearchPage>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let searched = !query.q.trim().is_empty();
    let rows = if searched {
        search(&state.orders().snapshot().await, &query.q)
            .into_iter()
            .map(|order| OrderRow {
                actions: search_actions(&order),
                order,
            })
            .collect()
    } else {
        Vec::new()
    };

    let encoded: String = url::form_urlencoded::byte_serialize(query.q.as_bytes()).collect();

    SearchTemplate {
        layout: Layout::load(&state, &session, &user, Page::Search).await,
        back: format!("{}?q={encoded}", Page::Search.path()),
        query: query.q,
        searched,
        rows,
    }
}
