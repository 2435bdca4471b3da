//! Integration tests for Bazaar.
//!
//! The tests drive the full axum router in-process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory store, so no
//! database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth` - Registration, login, token refresh, bearer checks
//! - `catalog` - Product CRUD, listing, images
//! - `cart` - Cart mutations and totals
//! - `orders` - Checkout, buy-now, status changes, admin listing
//! - `accounts` - Profile and addresses
//! - `postgres` - Concurrency and storage limits on the production store;
//!   ignored by default, run with `DATABASE_URL` set and `-- --ignored`

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use bazaar_api::config::ApiConfig;
use bazaar_api::state::AppState;
use bazaar_api::store::{MemoryStore, Store};
use bazaar_core::Username;

const TOKEN_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// Password used by [`TestApp::register`].
pub const PASSWORD: &str = "correct-horse";

/// A router over a fresh in-memory store.
pub struct TestApp {
    router: Router,
    store: MemoryStore,
}

impl TestApp {
    /// A new app with stock tracking off.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// A new app that decrements stock when orders are placed.
    #[must_use]
    pub fn with_stock_tracking() -> Self {
        Self::with_env(&[("BAZAAR_TRACK_STOCK", "true")])
    }

    fn with_env(extra: &[(&str, &str)]) -> Self {
        let mut vars = vec![
            ("BAZAAR_STORAGE", "memory"),
            ("BAZAAR_TOKEN_SECRET", TOKEN_SECRET),
        ];
        vars.extend_from_slice(extra);

        let config = ApiConfig::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_owned())
        })
        .expect("test configuration is valid");

        let store = MemoryStore::new();
        let router = bazaar_api::app(AppState::new(config, std::sync::Arc::new(store.clone())));
        Self { router, store }
    }

    /// Send a request and return the status with the JSON body
    /// (`Value::Null` when the body is empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request is well formed");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body is readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is JSON")
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, body).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    /// Register `username` and return its access token.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/register/",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["access_token"]
            .as_str()
            .expect("access token is a string")
            .to_owned()
    }

    /// Set the super user flag directly in the store.
    pub async fn promote(&self, username: &str) {
        let username = Username::parse(username).expect("valid username");
        let mut tx = self.store.begin().await.expect("store is available");
        let (user, _) = tx
            .get_user_credentials(&username)
            .await
            .expect("store is available")
            .expect("user exists");
        tx.set_super_user(user.id, true)
            .await
            .expect("profile exists");
        tx.commit().await.expect("commit succeeds");
    }

    /// Record an image path for a product directly in the store.
    pub async fn add_image(&self, product_id: i64, path: &str) {
        let id = i32::try_from(product_id).expect("product id fits i32");
        let mut tx = self.store.begin().await.expect("store is available");
        tx.add_product_image(id.into(), path)
            .await
            .expect("image is stored");
        tx.commit().await.expect("commit succeeds");
    }

    /// Create a product through the API and return its id.
    pub async fn create_product(&self, token: &str, name: &str, price: &str, quantity: u32) -> i64 {
        let (status, body) = self
            .post(
                "/products/add/",
                Some(token),
                Some(json!({
                    "name": name,
                    "price": price,
                    "description": format!("{name} description"),
                    "quantity": quantity,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
        body["id"].as_i64().expect("product id is a number")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
