//! Order workflow pages.
//!
//! Orders are shown in one tab per status. Each row carries the actions its
//! tab allows; actions address the order by id, never by list position.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use order_desk_core::{City, NewOrder, Order, OrderId, OrderPatch, OrderStatus, Page, ProductKind};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::{OrdersPage, RequirePage};
use crate::models::Flash;
use crate::orders::OrderError;
use crate::routes::{Layout, return_path};
use crate::state::AppState;

/// An action button on an order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    SetStatus(OrderStatus),
    Delete,
    Edit,
}

impl RowAction {
    /// Button label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SetStatus(OrderStatus::Pending) => "Pending",
            Self::SetStatus(OrderStatus::Completed) => "Completed",
            Self::SetStatus(OrderStatus::Delivered) => "Delivered",
            Self::SetStatus(OrderStatus::Notification) => "Notification",
            Self::Delete => "Delete",
            Self::Edit => "Edit",
        }
    }

    /// Last path segment of the action's route.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::SetStatus(_) => "status",
            Self::Delete => "delete",
            Self::Edit => "edit",
        }
    }

    /// Target status for status actions.
    #[must_use]
    pub const fn status(&self) -> Option<&'static str> {
        match self {
            Self::SetStatus(status) => Some(status.as_str()),
            Self::Delete | Self::Edit => None,
        }
    }

    /// Whether the action opens a page instead of posting a form.
    #[must_use]
    pub const fn is_link(&self) -> bool {
        matches!(self, Self::Edit)
    }

    #[must_use]
    pub const fn is_danger(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

/// Actions offered on each row of a status tab.
#[must_use]
pub fn tab_actions(tab: OrderStatus) -> Vec<RowAction> {
    use OrderStatus::{Completed, Delivered, Notification, Pending};
    use RowAction::{Delete, Edit, SetStatus};

    match tab {
        Pending => vec![SetStatus(Completed), SetStatus(Delivered), Delete, SetStatus(Notification)],
        Completed => vec![SetStatus(Pending), SetStatus(Delivered), Delete, SetStatus(Notification)],
        Delivered => vec![SetStatus(Pending), Delete, SetStatus(Notification)],
        Notification => vec![SetStatus(Pending), Delete, Edit],
    }
}

/// An order with the actions available on it.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub order: Order,
    pub actions: Vec<RowAction>,
}

/// A status tab header.
#[derive(Debug, Clone)]
pub struct TabLink {
    pub slug: &'static str,
    pub label: &'static str,
    pub count: usize,
    pub active: bool,
}

/// Query parameters for the orders page.
#[derive(Debug, Deserialize)]
pub struct TabQuery {
    pub tab: Option<String>,
}

/// Form carrying the page to return to.
#[derive(Debug, Deserialize)]
pub struct BackForm {
    pub back: Option<String>,
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
    pub back: Option<String>,
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub tabs: Vec<TabLink>,
    pub tab: OrderStatus,
    pub rows: Vec<OrderRow>,
    pub back: String,
}

/// Edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/edit.html")]
pub struct EditTemplate {
    pub layout: Layout,
    pub order: Order,
    pub cities: &'static [City],
    pub kinds: &'static [ProductKind],
}

fn tab_path(status: OrderStatus) -> String {
    format!("{}?tab={}", Page::Orders.path(), status.slug())
}

/// Display one status tab.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<OrdersPage>,
    Query(query): Query<TabQuery>,
) -> impl IntoResponse {
    let tab = query
        .tab
        .as_deref()
        .and_then(OrderStatus::from_slug)
        .unwrap_or_default();

    let orders = state.orders().snapshot().await;
    let tabs = OrderStatus::ALL
        .into_iter()
        .map(|status| TabLink {
            slug: status.slug(),
            label: status.as_str(),
            count: orders.iter().filter(|o| o.status == status).count(),
            active: status == tab,
        })
        .collect();
    let actions = tab_actions(tab);
    let rows = orders
        .into_iter()
        .filter(|o| o.status == tab)
        .map(|order| OrderRow {
            order,
            actions: actions.clone(),
        })
        .collect();

    OrdersTemplate {
        layout: Layout::load(&state, &session, &user, Page::Orders).await,
        tabs,
        tab,
        rows,
        back: tab_path(tab),
    }
}

/// Drop the cache and read every order from the record store again.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn refresh(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<OrdersPage>,
    Form(form): Form<BackForm>,
) -> Response {
    let flash = match state.orders().reload().await {
        Ok(count) => Flash::info(format!(
            "Reloaded {count} orders from {}",
            state.orders().describe()
        )),
        Err(e) => Flash::error(e.to_string()),
    };
    flash.push(&session).await;

    Redirect::to(&return_path(form.back.as_deref(), Page::Orders.path())).into_response()
}

/// Set the status of one order.
#[instrument(skip_all, fields(username = %user.username, order_id = %id))]
pub async fn set_status(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<OrdersPage>,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Response {
    let back = return_path(form.back.as_deref(), Page::Orders.path());

    let flash = match form.status.parse::<OrderStatus>() {
        Ok(status) => match state.orders().update_status_by_id(id, status).await {
            Ok(()) => Flash::success(format!("Order moved to {status}")),
            Err(e) => Flash::error(e.to_string()),
        },
        Err(e) => Flash::error(e.to_string()),
    };
    flash.push(&session).await;

    Redirect::to(&back).into_response()
}

/// Delete one order.
#[instrument(skip_all, fields(username = %user.username, order_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<OrdersPage>,
    Path(id): Path<OrderId>,
    Form(form): Form<BackForm>,
) -> Response {
    let flash = match state.orders().delete_by_id(id).await {
        Ok(order) => Flash::success(format!("Order for {} deleted", order.name)),
        Err(e) => Flash::error(e.to_string()),
    };
    flash.push(&session).await;

    Redirect::to(&return_path(form.back.as_deref(), Page::Orders.path())).into_response()
}

/// Display the edit form for one order.
pub async fn edit_page(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<OrdersPage>,
    Path(id): Path<OrderId>,
) -> Result<Response, AppError> {
    let order = state
        .orders()
        .get(id)
        .await
        .ok_or(OrderError::UnknownOrder(id))?;

    Ok(EditTemplate {
        layout: Layout::load(&state, &session, &user, Page::Orders).await,
        order,
        cities: &City::ALL,
        kinds: &ProductKind::ALL,
    }
    .into_response())
}

/// Apply an edit to one order.
///
/// Every editable field is replaced; status and creation date are kept.
#[instrument(skip_all, fields(username = %user.username, order_id = %id))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequirePage(user, ..): RequirePage<OrdersPage>,
    Path(id): Path<OrderId>,
    Form(form): Form<NewOrder>,
) -> Response {
    let edit_path = format!("{}/{id}/edit", Page::Orders.path());

    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(e) => {
            Flash::error(format!("Order not updated: {e}"))
                .push(&session)
                .await;
            return Redirect::to(&edit_path).into_response();
        }
    };

    match state.orders().edit_by_id(id, OrderPatch::replace_all(draft)).await {
        Ok(()) => {
            let status = state
                .orders()
                .get(id)
                .await
                .map_or(OrderStatus::Notification, |o| o.status);
            Flash::success("Order updated").push(&session).await;
            Redirect::to(&tab_path(status)).into_response()
        }
        Err(e) => {
            Flash::error(e.to_string()).push(&session).await;
            Redirect::to(&tab_path(OrderStatus::Notification)).into_response()
        }
    }
}
