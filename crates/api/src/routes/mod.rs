//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Liveness
//! GET  /health/ready                         - Store readiness
//!
//! # Auth
//! POST   /register/                          - Create account, returns tokens
//! POST   /login/                             - Token pair
//! POST   /token/refresh/                     - New access token
//!
//! # Account (requires auth)
//! GET    /user/profile/                      - Caller's profile
//! GET    /address/                           - Latest address
//! POST   /address/                           - Create address
//! PUT    /address/edit/{id}/                 - Edit address
//!
//! # Products
//! GET    /products/                          - Paginated listing
//! GET    /products/{id}/                     - Product detail
//! POST   /products/add/                      - Create (auth)
//! PUT    /products/edit/{id}/                - Update (auth)
//! DELETE /products/delete/{id}/              - Delete (auth)
//! PATCH  /products/toggle-listing/{id}/      - Flip is_listed (auth)
//! GET    /product/{id}/image/single/         - First image
//! GET    /product/{id}/image/all/            - All images
//!
//! # Cart (requires auth)
//! POST   /cart/add/{product_id}/             - Add one unit
//! POST   /cart/update/{product_id}/{action}/ - add | minus
//! DELETE /cart/remove/{product_id}/          - Remove item
//! GET    /cart/detail/                       - Cart items
//! POST   /cart/checkout/                     - Order the whole cart
//!
//! # Orders (requires auth)
//! POST   /buy-now/{product_id}/              - Order one unit
//! GET    /orders/                            - Caller's orders
//! POST   /orders/create/                     - Order a product list
//! PUT    /orders/{id}/change-status/         - Set status
//! DELETE /orders/{id}/delete/                - Delete order
//! GET    /admin/orders/                      - All orders (super users)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register/", post(auth::register))
        .route("/login/", post(auth::login))
        .route("/token/refresh/", post(auth::refresh))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile/", get(account::profile))
        .route(
            "/address/",
            get(account::latest_address).post(account::create_address),
        )
        .route("/address/edit/{id}/", put(account::edit_address))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products/", get(products::index))
        .route("/products/{id}/", get(products::show))
        .route("/products/add/", post(products::add))
        .route("/products/edit/{id}/", put(products::edit))
        .route("/products/delete/{id}/", delete(products::delete))
        .route(
            "/products/toggle-listing/{id}/",
            patch(products::toggle_listing),
        )
        .route("/product/{id}/image/single/", get(products::single_image))
        .route("/product/{id}/image/all/", get(products::all_images))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add/{product_id}/", post(cart::add))
        .route("/update/{product_id}/{action}/", post(cart::update))
        .route("/remove/{product_id}/", delete(cart::remove))
        .route("/detail/", get(cart::detail))
        .route("/checkout/", post(cart::checkout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/buy-now/{product_id}/", post(orders::buy_now))
        .route("/orders/", get(orders::index))
        .route("/orders/create/", post(orders::create))
        .route("/orders/{id}/change-status/", put(orders::change_status))
        .route("/orders/{id}/delete/", delete(orders::delete))
        .route("/admin/orders/", get(orders::admin_index))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(account_routes())
        .merge(product_routes())
        .nest("/cart", cart_routes())
        .merge(order_routes())
}
