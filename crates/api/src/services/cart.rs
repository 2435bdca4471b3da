//! Cart service.
//!
//! Each user owns at most one cart, created on first use. A cart holds one
//! item per product; an item's quantity never drops below 1 (it is deleted
//! instead). The cart total is derived from the items on every read.
//!
//! Mutations and checkout lock the cart row first, so requests for the same
//! user never overwrite each other's quantities.

use std::str::FromStr;

use tracing::instrument;

use bazaar_core::{ProductId, UserId};

use super::ServiceError;
use crate::models::{Cart, CartLine, CartSummary};
use crate::store::{Store, StoreTx};

const PRODUCT_NOT_FOUND: &str = "Product not found.";
const NOT_IN_CART: &str = "Product not found in the cart.";
const INVALID_ACTION: &str = "Invalid action. Use 'add' or 'minus'.";

/// A quantity change on a cart item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    /// Increase quantity by one.
    Add,
    /// Decrease quantity by one, removing the item at zero.
    Minus,
}

impl FromStr for CartAction {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "minus" => Ok(Self::Minus),
            _ => Err(ServiceError::invalid(INVALID_ACTION)),
        }
    }
}

/// Cart service.
pub struct CartService<'a> {
    store: &'a dyn Store,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Add one unit of a product to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartSummary, ServiceError> {
        let mut tx = self.store.begin().await?;
        require_product(tx.as_mut(), product_id).await?;

        let cart = cart_for(tx.as_mut(), user_id).await?;
        increment(tx.as_mut(), cart, product_id).await?;

        let summary = summarize(tx.as_mut(), cart).await?;
        tx.commit().await?;
        Ok(summary)
    }

    /// Apply `add` or `minus` to a product's cart item.
    ///
    /// `minus` on a quantity of 1 removes the item; on a product that is not in
    /// the cart it does nothing.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::InvalidArgument` if the action is not `add` or `minus`.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        user_id: UserId,
        product_id: ProductId,
        action: &str,
    ) -> Result<CartSummary, ServiceError> {
        let mut tx = self.store.begin().await?;
        require_product(tx.as_mut(), product_id).await?;
        let action = action.parse::<CartAction>()?;

        let cart = cart_for(tx.as_mut(), user_id).await?;
        match action {
            CartAction::Add => increment(tx.as_mut(), cart, product_id).await?,
            CartAction::Minus => decrement(tx.as_mut(), cart, product_id).await?,
        }

        let summary = summarize(tx.as_mut(), cart).await?;
        tx.commit().await?;
        Ok(summary)
    }

    /// Remove a product from the user's cart entirely.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    /// Returns `ServiceError::InvalidArgument` if the product is not in the cart.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartSummary, ServiceError> {
        let mut tx = self.store.begin().await?;
        require_product(tx.as_mut(), product_id).await?;

        let cart = tx
            .lock_cart(user_id)
            .await?
            .ok_or_else(|| ServiceError::invalid(NOT_IN_CART))?;
        let item = tx
            .get_cart_item(cart.id, product_id)
            .await?
            .ok_or_else(|| ServiceError::invalid(NOT_IN_CART))?;
        tx.delete_cart_item(item.id).await?;

        let summary = summarize(tx.as_mut(), cart).await?;
        tx.commit().await?;
        Ok(summary)
    }

    /// List the lines of the user's cart. A user without a cart has none.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn detail(&self, user_id: UserId) -> Result<Vec<CartLine>, ServiceError> {
        let mut tx = self.store.begin().await?;
        match tx.get_cart(user_id).await? {
            Some(cart) => Ok(tx.list_cart_lines(cart.id).await?),
            None => Ok(Vec::new()),
        }
    }
}

async fn require_product(tx: &mut dyn StoreTx, product_id: ProductId) -> Result<(), ServiceError> {
    tx.get_product(product_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::not_found(PRODUCT_NOT_FOUND))
}

/// Fetch the user's cart, creating it on first use. The cart stays locked
/// until the transaction ends, so the read-then-write below cannot interleave
/// with another request for the same user.
async fn cart_for(tx: &mut dyn StoreTx, user_id: UserId) -> Result<Cart, ServiceError> {
    Ok(tx.open_cart(user_id).await?)
}

async fn increment(
    tx: &mut dyn StoreTx,
    cart: Cart,
    product_id: ProductId,
) -> Result<(), ServiceError> {
    match tx.get_cart_item(cart.id, product_id).await? {
        Some(item) => {
            tx.set_cart_item_quantity(item.id, item.quantity.saturating_add(1))
                .await?;
        }
        None => {
            tx.create_cart_item(cart.id, product_id, 1).await?;
        }
    }
    Ok(())
}

async fn decrement(
    tx: &mut dyn StoreTx,
    cart: Cart,
    product_id: ProductId,
) -> Result<(), ServiceError> {
    match tx.get_cart_item(cart.id, product_id).await? {
        Some(item) if item.quantity > 1 => {
            tx.set_cart_item_quantity(item.id, item.quantity - 1)
                .await?;
        }
        Some(item) => tx.delete_cart_item(item.id).await?,
        None => {}
    }
    Ok(())
}

pub(crate) async fn summarize(
    tx: &mut dyn StoreTx,
    cart: Cart,
) -> Result<CartSummary, ServiceError> {
    let lines = tx.list_cart_lines(cart.id).await?;
    Ok(CartSummary { cart, lines })
}
