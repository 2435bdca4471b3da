//! Cart domain types.
//!
//! A cart never stores its total: [`CartSummary::total_price`] is recomputed
//! from the lines every time a summary is built.

use bazaar_core::{CartId, CartItemId, Price, ProductId, UserId};

/// A user's cart. Each user has at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
}

/// One product in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: u32,
}

/// A cart item joined with the current price of its product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub item: CartItem,
    pub unit_price: Price,
}

impl CartLine {
    /// Quantity times the current unit price.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.item.quantity)
    }
}

/// A cart with its lines and derived total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartSummary {
    /// Sum of quantity times price over all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// IDs of the products in the cart, in line order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|line| line.item.product_id).collect()
    }

    /// Find the line for a product.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| line.item.product_id == product_id)
    }
}
