//! Order service.
//!
//! Orders are placed from a single product (buy now), from an explicit
//! product list, or from the user's whole cart (checkout). Every placed order
//! gets an admin wrapper in the same transaction. When stock tracking is on,
//! each ordered quantity is taken off the product's stock, never below zero.

use tracing::instrument;

use bazaar_core::{OrderId, OrderStatus, Page, PageRequest, Price, ProductId, UserId};

use super::ServiceError;
use crate::models::{AdminOrder, NewOrder, NewOrderItem, Order};
use crate::store::{Store, StoreTx};

const PRODUCT_NOT_FOUND: &str = "Product not found.";
const ORDER_NOT_FOUND: &str = "Order not found.";
const CART_NOT_FOUND: &str = "Cart not found.";
const CART_EMPTY: &str = "Cart is empty.";
const NO_PRODUCTS: &str = "At least one product is required.";
const TOTAL_TOO_LARGE: &str = "Order total is too large.";
const STATUS_REQUIRED: &str = "Status must be provided in the request data.";
const STATUS_INVALID: &str = "Invalid status provided.";
const NOT_OWNER_STATUS: &str = "You do not have permission to change the status of this order.";
const NOT_OWNER_DELETE: &str = "You do not have permission to delete this order.";
const NOT_ADMIN: &str = "You do not have permission to access this resource.";

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
    track_stock: bool,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, track_stock: bool) -> Self {
        Self { store, track_stock }
    }

    /// Order one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn buy_now(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.store.begin().await?;
        let item = single_item(tx.as_mut(), product_id).await?;

        let order = self
            .place(tx.as_mut(), NewOrder::confirmed(user_id, vec![item]))
            .await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, total = %order.total_price, "Order placed");
        Ok(order)
    }

    /// Order one unit of each listed product.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidArgument` if the list is empty.
    /// Returns `ServiceError::NotFound` if any product does not exist.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        user_id: UserId,
        product_ids: &[ProductId],
    ) -> Result<Order, ServiceError> {
        if product_ids.is_empty() {
            return Err(ServiceError::invalid(NO_PRODUCTS));
        }

        let mut tx = self.store.begin().await?;
        let mut items = Vec::with_capacity(product_ids.len());
        for &product_id in product_ids {
            items.push(single_item(tx.as_mut(), product_id).await?);
        }

        let order = self
            .place(tx.as_mut(), NewOrder::confirmed(user_id, items))
            .await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, total = %order.total_price, "Order placed");
        Ok(order)
    }

    /// Turn the user's cart into an order and empty the cart.
    ///
    /// The cart row is locked for the whole transaction, so concurrent
    /// checkouts of the same cart run one after the other.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the user has no cart.
    /// Returns `ServiceError::InvalidArgument` if the cart has no items or its
    /// total does not fit an order.
    #[instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<Order, ServiceError> {
        let mut tx = self.store.begin().await?;
        let cart = tx
            .lock_cart(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(CART_NOT_FOUND))?;

        let lines = tx.list_cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(ServiceError::invalid(CART_EMPTY));
        }

        let items = lines
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.item.product_id,
                quantity: line.item.quantity,
                unit_price: line.unit_price,
            })
            .collect();
        let order = self
            .place(tx.as_mut(), NewOrder::confirmed(user_id, items))
            .await?;

        let cleared = tx.clear_cart(cart.id).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total_price,
            items = cleared,
            "Cart checked out"
        );
        Ok(order)
    }

    /// Set the status of one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    /// Returns `ServiceError::PermissionDenied` if the user does not own it.
    /// Returns `ServiceError::InvalidArgument` if the status is missing or unknown.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        user_id: UserId,
        order_id: OrderId,
        status: Option<&str>,
    ) -> Result<Order, ServiceError> {
        let mut tx = self.store.begin().await?;
        let mut order = owned_order(tx.as_mut(), user_id, order_id, NOT_OWNER_STATUS).await?;

        let status = status
            .ok_or_else(|| ServiceError::invalid(STATUS_REQUIRED))?
            .parse::<OrderStatus>()
            .map_err(|_| ServiceError::invalid(STATUS_INVALID))?;

        tx.set_order_status(order.id, status).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, from = %order.status, to = %status, "Order status changed");
        order.status = status;
        Ok(order)
    }

    /// Delete one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist.
    /// Returns `ServiceError::PermissionDenied` if the user does not own it.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId, order_id: OrderId) -> Result<(), ServiceError> {
        let mut tx = self.store.begin().await?;
        let order = owned_order(tx.as_mut(), user_id, order_id, NOT_OWNER_DELETE).await?;

        tx.delete_order(order.id).await?;
        tx.commit().await?;

        tracing::info!(order_id = %order.id, "Order deleted");
        Ok(())
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the store fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_orders_for_user(user_id).await?)
    }

    /// One page of every order's admin wrapper, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::PermissionDenied` unless the user is a super user.
    /// Returns `ServiceError::NotFound` ("Invalid page.") for a page past the end.
    #[instrument(skip(self))]
    pub async fn list_admin(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<AdminOrder>, ServiceError> {
        let mut tx = self.store.begin().await?;
        let is_super_user = tx
            .get_profile(user_id)
            .await?
            .is_some_and(|profile| profile.is_super_user);
        if !is_super_user {
            tracing::warn!(user_id = %user_id, "Admin order listing refused");
            return Err(ServiceError::permission_denied(NOT_ADMIN));
        }

        let (orders, count) = tx.list_admin_orders(page).await?;
        Ok(Page::new(page, count, orders)?)
    }

    /// Insert the order, its admin wrapper and, if enabled, the stock changes.
    async fn place(&self, tx: &mut dyn StoreTx, order: NewOrder) -> Result<Order, ServiceError> {
        if order.total_price().amount() > Price::max_total() {
            return Err(ServiceError::invalid(TOTAL_TOO_LARGE));
        }

        let order = tx.create_order(&order).await?;
        tx.create_admin_order(&order).await?;

        if self.track_stock {
            for item in &order.items {
                tx.decrement_stock(item.product_id, item.quantity).await?;
            }
        }
        Ok(order)
    }
}

async fn single_item(
    tx: &mut dyn StoreTx,
    product_id: ProductId,
) -> Result<NewOrderItem, ServiceError> {
    let product = tx
        .get_product(product_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(PRODUCT_NOT_FOUND))?;
    Ok(NewOrderItem {
        product_id: product.id,
        quantity: 1,
        unit_price: product.price,
    })
}

/// Fetch an order, checking ownership before anything else about the request.
async fn owned_order(
    tx: &mut dyn StoreTx,
    user_id: UserId,
    order_id: OrderId,
    denied: &str,
) -> Result<Order, ServiceError> {
    let order = tx
        .get_order(order_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(ORDER_NOT_FOUND))?;
    if order.user_id != user_id {
        tracing::warn!(user_id = %user_id, order_id = %order_id, "Order access refused");
        return Err(ServiceError::permission_denied(denied));
    }
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::Username;

    use super::*;
    use crate::models::NewProduct;
    use crate::services::CartService;
    use crate::store::MemoryStore;

    async fn seed_product(store: &MemoryStore, cents: i64, quantity: u32) -> ProductId {
        let mut tx = store.begin().await.unwrap();
        let product = tx
            .create_product(&NewProduct {
                name: "Teapot".to_owned(),
                is_active: true,
                price: Price::from_cents(cents).unwrap(),
                description: "Cast iron teapot".to_owned(),
                quantity,
                is_listed: true,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        product.id
    }

    async fn seed_user(store: &MemoryStore, name: &str, is_super_user: bool) -> UserId {
        let mut tx = store.begin().await.unwrap();
        let (user, _) = tx
            .create_user(&Username::parse(name).unwrap(), "hash")
            .await
            .unwrap();
        tx.set_super_user(user.id, is_super_user).await.unwrap();
        tx.commit().await.unwrap();
        user.id
    }

    async fn stock(store: &MemoryStore, id: ProductId) -> u32 {
        let mut tx = store.begin().await.unwrap();
        tx.get_product(id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_checkout_scenario() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let product = seed_product(&store, 1000, 10).await;
        let cart = CartService::new(&store);
        for _ in 0..3 {
            cart.add(alice, product).await.unwrap();
        }

        let order = OrderService::new(&store, false)
            .checkout(alice)
            .await
            .unwrap();

        assert_eq!(order.total_price.to_string(), "30.00");
        assert_eq!(order.product_ids(), vec![product]);
        assert_eq!(order.items.first().unwrap().quantity, 3);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert!(cart.detail(alice).await.unwrap().is_empty());
        // Stock untouched while tracking is off
        assert_eq!(stock(&store, product).await, 10);
    }

    #[tokio::test]
    async fn test_checkout_contains_every_cart_product() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let a = seed_product(&store, 100, 5).await;
        let b = seed_product(&store, 250, 5).await;
        let cart = CartService::new(&store);
        cart.add(alice, a).await.unwrap();
        cart.add(alice, b).await.unwrap();

        let orders = OrderService::new(&store, false);
        let mut ids = orders.checkout(alice).await.unwrap().product_ids();
        ids.sort();
        assert_eq!(ids, vec![a, b]);
        assert_eq!(orders.list(alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_without_cart_or_items() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let product = seed_product(&store, 100, 5).await;
        let orders = OrderService::new(&store, false);

        assert!(matches!(
            orders.checkout(alice).await,
            Err(ServiceError::NotFound(_))
        ));

        let cart = CartService::new(&store);
        cart.add(alice, product).await.unwrap();
        cart.update(alice, product, "minus").await.unwrap();
        assert!(matches!(
            orders.checkout(alice).await,
            Err(ServiceError::InvalidArgument(ref m)) if m == CART_EMPTY
        ));
        assert!(orders.list(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_of_large_cart() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let product = seed_product(&store, 9_999_999_999, 1).await;
        let cart = CartService::new(&store);
        for _ in 0..101 {
            cart.add(alice, product).await.unwrap();
        }

        let order = OrderService::new(&store, false)
            .checkout(alice)
            .await
            .unwrap();
        assert_eq!(order.total_price.to_string(), "10099999998.99");
    }

    #[tokio::test]
    async fn test_checkout_rejects_total_beyond_order_limit() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let mut tx = store.begin().await.unwrap();
        let basket = tx.open_cart(alice).await.unwrap();
        tx.commit().await.unwrap();
        for _ in 0..3 {
            let product = seed_product(&store, 9_999_999_999, 1).await;
            let mut tx = store.begin().await.unwrap();
            tx.create_cart_item(basket.id, product, u32::MAX).await.unwrap();
            tx.commit().await.unwrap();
        }

        let err = OrderService::new(&store, false)
            .checkout(alice)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(ref m) if m == TOTAL_TOO_LARGE));

        // Nothing was placed and the cart is untouched
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.list_cart_lines(basket.id).await.unwrap().len(), 3);
        assert!(tx.list_orders_for_user(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_buy_now() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let product = seed_product(&store, 1999, 1).await;
        let orders = OrderService::new(&store, false);

        let order = orders.buy_now(alice, product).await.unwrap();
        assert_eq!(order.total_price.to_string(), "19.99");
        assert_eq!(order.items.len(), 1);

        assert!(matches!(
            orders.buy_now(alice, ProductId::new(77)).await,
            Err(ServiceError::NotFound(ref m)) if m == PRODUCT_NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn test_create_from_product_list() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let a = seed_product(&store, 100, 5).await;
        let b = seed_product(&store, 250, 5).await;
        let orders = OrderService::new(&store, false);

        let order = orders.create(alice, &[a, b]).await.unwrap();
        assert_eq!(order.total_price.to_string(), "3.50");

        assert!(matches!(
            orders.create(alice, &[]).await,
            Err(ServiceError::InvalidArgument(_))
        ));
        assert!(matches!(
            orders.create(alice, &[a, ProductId::new(99)]).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(orders.list(alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_change_status() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let product = seed_product(&store, 100, 5).await;
        let orders = OrderService::new(&store, false);
        let order = orders.buy_now(alice, product).await.unwrap();

        let changed = orders
            .change_status(alice, order.id, Some("DELIVERED"))
            .await
            .unwrap();
        assert_eq!(changed.status, OrderStatus::Delivered);

        // Any status may follow any other
        let changed = orders
            .change_status(alice, order.id, Some("CONFIRMED"))
            .await
            .unwrap();
        assert_eq!(changed.status, OrderStatus::Confirmed);

        assert!(matches!(
            orders.change_status(alice, order.id, None).await,
            Err(ServiceError::InvalidArgument(ref m)) if m == STATUS_REQUIRED
        ));
        assert!(matches!(
            orders.change_status(alice, order.id, Some("SHIPPED")).await,
            Err(ServiceError::InvalidArgument(ref m)) if m == STATUS_INVALID
        ));
        assert!(matches!(
            orders
                .change_status(alice, OrderId::new(404), Some("DELIVERED"))
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_non_owner_is_denied_regardless_of_status() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let mallory = seed_user(&store, "mallory", false).await;
        let product = seed_product(&store, 100, 5).await;
        let orders = OrderService::new(&store, false);
        let order = orders.buy_now(alice, product).await.unwrap();

        for status in [Some("DELIVERED"), Some("bogus"), None] {
            assert!(matches!(
                orders.change_status(mallory, order.id, status).await,
                Err(ServiceError::PermissionDenied(ref m)) if m == NOT_OWNER_STATUS
            ));
        }
        assert!(matches!(
            orders.delete(mallory, order.id).await,
            Err(ServiceError::PermissionDenied(ref m)) if m == NOT_OWNER_DELETE
        ));
        assert_eq!(orders.list(alice).await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_delete_removes_admin_wrapper() {
        let store = MemoryStore::new();
        let admin = seed_user(&store, "admin", true).await;
        let product = seed_product(&store, 100, 5).await;
        let orders = OrderService::new(&store, false);
        let order = orders.buy_now(admin, product).await.unwrap();

        assert_eq!(
            orders
                .list_admin(admin, PageRequest::first())
                .await
                .unwrap()
                .count,
            1
        );
        orders.delete(admin, order.id).await.unwrap();
        assert_eq!(
            orders
                .list_admin(admin, PageRequest::first())
                .await
                .unwrap()
                .count,
            0
        );
        assert!(matches!(
            orders.delete(admin, order.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_listing_requires_super_user() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let admin = seed_user(&store, "admin", true).await;
        let product = seed_product(&store, 100, 50).await;
        let orders = OrderService::new(&store, false);
        for _ in 0..12 {
            orders.buy_now(alice, product).await.unwrap();
        }

        assert!(matches!(
            orders.list_admin(alice, PageRequest::first()).await,
            Err(ServiceError::PermissionDenied(ref m)) if m == NOT_ADMIN
        ));

        let first = orders
            .list_admin(admin, PageRequest::first())
            .await
            .unwrap();
        assert_eq!(first.count, 12);
        assert_eq!(first.results.len(), 10);
        let newest = first.results.first().unwrap();
        let oldest = first.results.last().unwrap();
        assert!(newest.order.id > oldest.order.id);

        let second = orders
            .list_admin(admin, PageRequest::new(2, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(second.results.len(), 2);
        assert!(matches!(
            orders
                .list_admin(admin, PageRequest::new(3, 10).unwrap())
                .await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stock_tracking_floors_at_zero() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice", false).await;
        let product = seed_product(&store, 100, 2).await;
        let cart = CartService::new(&store);
        for _ in 0..3 {
            cart.add(alice, product).await.unwrap();
        }

        let orders = OrderService::new(&store, true);
        orders.checkout(alice).await.unwrap();
        assert_eq!(stock(&store, product).await, 0);

        orders.buy_now(alice, product).await.unwrap();
        assert_eq!(stock(&store, product).await, 0);
    }
}
