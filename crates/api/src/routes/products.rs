//! Product and product image route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{Page, PageRequest, Price, ProductId, ProductImageId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Product, ProductChanges, ProductImage};
use crate::services::ServiceError;
use crate::state::AppState;

/// Product as returned by the API.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub is_active: bool,
    pub price: Price,
    pub description: String,
    pub quantity: u32,
    pub is_listed: bool,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            is_active: product.is_active,
            price: product.price,
            description: product.description,
            quantity: product.quantity,
            is_listed: product.is_listed,
        }
    }
}

/// Product image record as returned by the API.
#[derive(Debug, Serialize)]
pub struct ImageView {
    pub id: ProductImageId,
    pub image: String,
}

impl From<ProductImage> for ImageView {
    fn from(image: ProductImage) -> Self {
        Self {
            id: image.id,
            image: image.image,
        }
    }
}

/// `?page=` query of paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub(crate) fn resolve(&self) -> std::result::Result<PageRequest, ServiceError> {
        Ok(PageRequest::from_query(self.page.as_deref())?)
    }
}

/// List products, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<ProductView>>> {
    let page = state.catalog().list(query.resolve()?).await?;
    Ok(Json(page.map(ProductView::from)))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = state.catalog().get(id).await?;
    Ok(Json(product.into()))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: std::result::Result<Json<ProductChanges>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let Json(changes) = body?;
    let product = state.catalog().create(changes).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    body: std::result::Result<Json<ProductChanges>, JsonRejection>,
) -> Result<Json<ProductView>> {
    let Json(changes) = body?;
    let product = state.catalog().update(id, changes).await?;
    Ok(Json(product.into()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.catalog().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn toggle_listing(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = state.catalog().toggle_listing(id).await?;
    Ok(Json(product.into()))
}

/// First image of a product.
#[instrument(skip(state))]
pub async fn single_image(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ImageView>> {
    let image = state.catalog().single_image(id).await?;
    Ok(Json(image.into()))
}

/// Every image of a product.
#[instrument(skip(state))]
pub async fn all_images(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<ImageView>>> {
    let images = state.catalog().all_images(id).await?;
    Ok(Json(images.into_iter().map(ImageView::from).collect()))
}
