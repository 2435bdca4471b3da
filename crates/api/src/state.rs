//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::services::{AccountService, AuthService, CartService, CatalogService, OrderService};
use crate::store::Store;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// store and configuration. Services are built per request from it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    store: Arc<dyn Store>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the record store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store(), &self.inner.config.auth)
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(self.store())
    }

    #[must_use]
    pub fn cart(&self) -> CartService<'_> {
        CartService::new(self.store())
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store(), self.inner.config.track_stock)
    }

    #[must_use]
    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(self.store())
    }
}
