//! Cart route handlers.
//!
//! Every mutation returns the whole cart with its derived total.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use bazaar_core::{CartId, CartItemId, Price, ProductId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{CartLine, CartSummary};
use crate::routes::orders::OrderView;
use crate::state::AppState;

/// Cart as returned by the API.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub user: UserId,
    pub products: Vec<ProductId>,
    pub items: Vec<CartItemView>,
    pub total_price: Price,
}

impl From<CartSummary> for CartView {
    fn from(summary: CartSummary) -> Self {
        Self {
            id: summary.cart.id,
            user: summary.cart.user_id,
            products: summary.product_ids(),
            total_price: summary.total_price(),
            items: summary.lines.into_iter().map(CartItemView::from).collect(),
        }
    }
}

/// One cart item with its product's current price.
#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product: ProductId,
    pub quantity: u32,
    pub price: Price,
    pub total_price: Price,
}

impl From<CartLine> for CartItemView {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.item.id,
            product: line.item.product_id,
            quantity: line.item.quantity,
            price: line.unit_price,
            total_price: line.line_total(),
        }
    }
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<(StatusCode, Json<CartView>)> {
    let cart = state.cart().add(user.id, product_id).await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((product_id, action)): Path<(ProductId, String)>,
) -> Result<Json<CartView>> {
    let cart = state.cart().update(user.id, product_id, &action).await?;
    Ok(Json(cart.into()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    let cart = state.cart().remove(user.id, product_id).await?;
    Ok(Json(cart.into()))
}

/// Items of the caller's cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn detail(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<CartItemView>>> {
    let lines = state.cart().detail(user.id).await?;
    Ok(Json(lines.into_iter().map(CartItemView::from).collect()))
}

/// Place an order for everything in the cart and empty it.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<(StatusCode, Json<OrderView>)> {
    let order = state.orders().checkout(user.id).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}
