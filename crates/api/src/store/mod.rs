//! Transactional record store.
//!
//! Services never touch the database directly. They open a [`StoreTx`] from a
//! [`Store`], run their reads and writes through it and call
//! [`StoreTx::commit`]. Dropping a transaction without committing discards
//! every change it made.
//!
//! Two backends implement the traits:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx, the production backend
//! - [`MemoryStore`] - in-process tables for development and tests

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{
    AddressId, CartId, CartItemId, OrderId, OrderStatus, PageRequest, ProductId, ProfileId, UserId,
    Username,
};

use crate::db::RepositoryError;
use crate::models::{
    Address, AddressFields, AdminOrder, Cart, CartItem, CartLine, NewOrder, NewProduct, NewToken,
    Order, Product, ProductImage, TokenKind, TokenRecord, User, UserProfile,
};

/// A source of store transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError>;

    /// Check that the backend can serve requests.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// One unit of work against the store.
///
/// Operations that modify a row by ID return `RepositoryError::NotFound` when
/// the row does not exist.
#[async_trait]
pub trait StoreTx: Send {
    /// Make every change in this transaction durable.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a user and its profile.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn create_user(
        &mut self,
        username: &Username,
        password_hash: &str,
    ) -> Result<(User, UserProfile), RepositoryError>;

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up a user together with its password hash.
    async fn get_user_credentials(
        &mut self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn get_profile(&mut self, user_id: UserId)
    -> Result<Option<UserProfile>, RepositoryError>;

    async fn set_super_user(
        &mut self,
        user_id: UserId,
        is_super_user: bool,
    ) -> Result<UserProfile, RepositoryError>;

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn insert_token(&mut self, token: &NewToken) -> Result<(), RepositoryError>;

    async fn find_token(
        &mut self,
        digest: &str,
        kind: TokenKind,
    ) -> Result<Option<TokenRecord>, RepositoryError>;

    /// Delete tokens that expired at or before `now`. Returns how many were removed.
    async fn delete_expired_tokens(&mut self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;

    // =========================================================================
    // Products
    // =========================================================================

    /// One page of products, newest first, plus the total count.
    async fn list_products(
        &mut self,
        page: PageRequest,
    ) -> Result<(Vec<Product>, u64), RepositoryError>;

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn create_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError>;

    async fn update_product(&mut self, product: &Product) -> Result<Product, RepositoryError>;

    /// Delete a product with its images and cart items. Returns false if absent.
    async fn delete_product(&mut self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Reduce stock by `by`, never below zero.
    async fn decrement_stock(&mut self, id: ProductId, by: u32) -> Result<(), RepositoryError>;

    /// Images of a product, oldest first.
    async fn list_product_images(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError>;

    async fn add_product_image(
        &mut self,
        product_id: ProductId,
        image: &str,
    ) -> Result<ProductImage, RepositoryError>;

    // =========================================================================
    // Carts
    // =========================================================================

    async fn get_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Like [`StoreTx::get_cart`], but holds the cart row until the transaction ends.
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Fetch the user's cart, creating it if absent, and hold its row until
    /// the transaction ends.
    ///
    /// Every cart mutation goes through this (or [`StoreTx::lock_cart`]), so
    /// concurrent requests for the same user apply one after the other.
    async fn open_cart(&mut self, user_id: UserId) -> Result<Cart, RepositoryError>;

    async fn get_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError>;

    async fn create_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError>;

    async fn set_cart_item_quantity(
        &mut self,
        id: CartItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;

    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<(), RepositoryError>;

    /// Cart items joined with current product prices, oldest first.
    async fn list_cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Delete every item of a cart. Returns how many were removed.
    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64, RepositoryError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Insert an order and its items; the total is taken from [`NewOrder::total_price`].
    async fn create_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders of a user, newest first.
    async fn list_orders_for_user(&mut self, user_id: UserId)
    -> Result<Vec<Order>, RepositoryError>;

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError>;

    /// Delete an order with its items and admin wrapper. Returns false if absent.
    async fn delete_order(&mut self, id: OrderId) -> Result<bool, RepositoryError>;

    async fn create_admin_order(&mut self, order: &Order) -> Result<AdminOrder, RepositoryError>;

    /// One page of admin orders, newest first, plus the total count.
    async fn list_admin_orders(
        &mut self,
        page: PageRequest,
    ) -> Result<(Vec<AdminOrder>, u64), RepositoryError>;

    // =========================================================================
    // Addresses
    // =========================================================================

    /// The highest-id address of a profile.
    async fn latest_address(
        &mut self,
        profile_id: ProfileId,
    ) -> Result<Option<Address>, RepositoryError>;

    async fn get_address(&mut self, id: AddressId) -> Result<Option<Address>, RepositoryError>;

    async fn create_address(
        &mut self,
        profile_id: ProfileId,
        fields: &AddressFields,
    ) -> Result<Address, RepositoryError>;

    async fn update_address(&mut self, address: &Address) -> Result<(), RepositoryError>;
}
