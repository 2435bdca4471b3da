//! Order domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{AdminOrderId, OrderId, OrderStatus, Price, ProductId, UserId};

/// A product captured in an order with the price paid for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
}

/// A placed order.
///
/// Items and total are snapshots taken when the order was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// IDs of the ordered products, in item order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|item| item.product_id).collect()
    }
}

/// An order about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<NewOrderItem>,
    pub status: OrderStatus,
}

/// An item of a [`NewOrder`].
pub type NewOrderItem = OrderItem;

impl NewOrder {
    /// A confirmed order for `items`.
    #[must_use]
    pub fn confirmed(user_id: UserId, items: Vec<NewOrderItem>) -> Self {
        Self {
            user_id,
            items,
            status: OrderStatus::Confirmed,
        }
    }

    /// Sum of quantity times unit price.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items
            .iter()
            .map(|item| item.unit_price.times(item.quantity))
            .sum()
    }
}

/// The admin-visible wrapper around an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOrder {
    pub id: AdminOrderId,
    pub order: Order,
}
