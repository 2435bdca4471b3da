//! Order route handlers, including buy-now and the admin listing.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{AdminOrderId, OrderId, OrderStatus, Page, Price, ProductId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{AdminOrder, Order, OrderItem};
use crate::routes::products::PageQuery;
use crate::state::AppState;

/// Order as returned by the API.
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub user: UserId,
    pub products: Vec<ProductId>,
    pub items: Vec<OrderItemView>,
    pub total_price: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user: order.user_id,
            products: order.product_ids(),
            items: order.items.iter().copied().map(OrderItemView::from).collect(),
            total_price: order.total_price,
            status: order.status,
            created_at: order.created_at,
        }
    }
}

/// A product line of an order, priced when the order was placed.
#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub product: ProductId,
    pub quantity: u32,
    pub price: Price,
}

impl From<OrderItem> for OrderItemView {
    fn from(item: OrderItem) -> Self {
        Self {
            product: item.product_id,
            quantity: item.quantity,
            price: item.unit_price,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminOrderView {
    pub id: AdminOrderId,
    pub order: OrderView,
}

impl From<AdminOrder> for AdminOrderView {
    fn from(admin_order: AdminOrder) -> Self {
        Self {
            id: admin_order.id,
            order: admin_order.order.into(),
        }
    }
}

/// Body of `POST /orders/create/`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub products: Vec<ProductId>,
}

/// Body of `PUT /orders/{id}/change-status/`.
#[derive(Debug, Default, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: Option<String>,
}

/// The caller's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    let orders = state.orders().list(user.id).await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn buy_now(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let order = state.orders().buy_now(user.id, product_id).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let Json(request) = body?;
    let order = state.orders().create(user.id, &request.products).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// Set an order's status.
///
/// An unreadable body counts as a missing status, so ownership is still
/// checked first.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn change_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
    body: std::result::Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<Json<OrderView>> {
    let Json(request) = body.unwrap_or_default();
    let order = state
        .orders()
        .change_status(user.id, order_id, request.status.as_deref())
        .await?;
    Ok(Json(order.into()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<StatusCode> {
    state.orders().delete(user.id, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every order, for super users.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<AdminOrderView>>> {
    let page = state.orders().list_admin(user.id, query.resolve()?).await?;
    Ok(Json(page.map(AdminOrderView::from)))
}
