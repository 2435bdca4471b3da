//! In-process store backend.
//!
//! All tables live behind one async mutex. A transaction holds the lock for
//! its whole lifetime and works on a copy of the tables, which replaces the
//! shared state only on commit. Transactions are therefore serialized, and an
//! uncommitted transaction leaves no trace.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use bazaar_core::{
    AddressId, AdminOrderId, CartId, CartItemId, OrderId, OrderStatus, PageRequest, ProductId,
    ProductImageId, ProfileId, UserId, Username,
};

use super::{Store, StoreTx};
use crate::db::RepositoryError;
use crate::models::{
    Address, AddressFields, AdminOrder, Cart, CartItem, CartLine, NewOrder, NewProduct, NewToken,
    Order, Product, ProductImage, TokenKind, TokenRecord, User, UserProfile,
};

/// Store that keeps every record in memory.
///
/// Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = Tables::clone(&guard);
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct UserEntry {
    user: User,
    password_hash: String,
}

/// Last issued ID per table; IDs start at 1 like a `SERIAL` column.
#[derive(Debug, Clone, Default)]
struct Sequences {
    user: i32,
    profile: i32,
    product: i32,
    image: i32,
    cart: i32,
    cart_item: i32,
    order: i32,
    admin_order: i32,
    address: i32,
}

fn next(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<UserId, UserEntry>,
    profiles: BTreeMap<ProfileId, UserProfile>,
    tokens: HashMap<String, TokenRecord>,
    products: BTreeMap<ProductId, Product>,
    images: BTreeMap<ProductImageId, ProductImage>,
    carts: BTreeMap<CartId, Cart>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    admin_orders: BTreeMap<AdminOrderId, OrderId>,
    addresses: BTreeMap<AddressId, Address>,
}

impl Tables {
    fn cart_for(&self, user_id: UserId) -> Option<Cart> {
        self.carts
            .values()
            .find(|cart| cart.user_id == user_id)
            .copied()
    }
}

/// Skip and take one page from a newest-first iterator.
fn paginate<T>(items: impl Iterator<Item = T>, page: PageRequest) -> Vec<T> {
    items
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
        .collect()
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    async fn create_user(
        &mut self,
        username: &Username,
        password_hash: &str,
    ) -> Result<(User, UserProfile), RepositoryError> {
        let t = &mut self.working;
        if t.users.values().any(|e| &e.user.username == username) {
            return Err(RepositoryError::Conflict(
                "username already exists".to_owned(),
            ));
        }

        let user = User {
            id: UserId::new(next(&mut t.seq.user)),
            username: username.clone(),
            date_joined: Utc::now(),
        };
        let profile = UserProfile {
            id: ProfileId::new(next(&mut t.seq.profile)),
            user_id: user.id,
            is_super_user: false,
        };

        t.users.insert(
            user.id,
            UserEntry {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        t.profiles.insert(profile.id, profile);
        Ok((user, profile))
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.working.users.get(&id).map(|e| e.user.clone()))
    }

    async fn get_user_credentials(
        &mut self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .working
            .users
            .values()
            .find(|e| &e.user.username == username)
            .map(|e| (e.user.clone(), e.password_hash.clone())))
    }

    async fn get_profile(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self
            .working
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .copied())
    }

    async fn set_super_user(
        &mut self,
        user_id: UserId,
        is_super_user: bool,
    ) -> Result<UserProfile, RepositoryError> {
        let profile = self
            .working
            .profiles
            .values_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(RepositoryError::NotFound)?;
        profile.is_super_user = is_super_user;
        Ok(*profile)
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn insert_token(&mut self, token: &NewToken) -> Result<(), RepositoryError> {
        if self.working.tokens.contains_key(&token.digest) {
            return Err(RepositoryError::Conflict(
                "token digest already exists".to_owned(),
            ));
        }

        self.working.tokens.insert(
            token.digest.clone(),
            TokenRecord {
                user_id: token.user_id,
                kind: token.kind,
                expires_at: token.expires_at,
            },
        );
        Ok(())
    }

    async fn find_token(
        &mut self,
        digest: &str,
        kind: TokenKind,
    ) -> Result<Option<TokenRecord>, RepositoryError> {
        Ok(self
            .working
            .tokens
            .get(digest)
            .filter(|record| record.kind == kind)
            .copied())
    }

    async fn delete_expired_tokens(&mut self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let before = self.working.tokens.len();
        self.working.tokens.retain(|_, record| !record.is_expired(now));
        Ok((before - self.working.tokens.len()) as u64)
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn list_products(
        &mut self,
        page: PageRequest,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let products = &self.working.products;
        let results = paginate(products.values().rev().cloned(), page);
        Ok((results, products.len() as u64))
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn create_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let t = &mut self.working;
        let product = Product {
            id: ProductId::new(next(&mut t.seq.product)),
            name: product.name.clone(),
            is_active: product.is_active,
            price: product.price,
            description: product.description.clone(),
            quantity: product.quantity,
            is_listed: product.is_listed,
        };
        t.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&mut self, product: &Product) -> Result<Product, RepositoryError> {
        let stored = self
            .working
            .products
            .get_mut(&product.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = product.clone();
        Ok(product.clone())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool, RepositoryError> {
        let t = &mut self.working;
        if t.products.remove(&id).is_none() {
            return Ok(false);
        }

        t.images.retain(|_, image| image.product_id != id);
        t.cart_items.retain(|_, item| item.product_id != id);
        for order in t.orders.values_mut() {
            order.items.retain(|item| item.product_id != id);
        }
        Ok(true)
    }

    async fn decrement_stock(&mut self, id: ProductId, by: u32) -> Result<(), RepositoryError> {
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        product.quantity = product.quantity.saturating_sub(by);
        Ok(())
    }

    async fn list_product_images(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        Ok(self
            .working
            .images
            .values()
            .filter(|image| image.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn add_product_image(
        &mut self,
        product_id: ProductId,
        image: &str,
    ) -> Result<ProductImage, RepositoryError> {
        let t = &mut self.working;
        if !t.products.contains_key(&product_id) {
            return Err(RepositoryError::NotFound);
        }

        let image = ProductImage {
            id: ProductImageId::new(next(&mut t.seq.image)),
            product_id,
            image: image.to_owned(),
        };
        t.images.insert(image.id, image.clone());
        Ok(image)
    }

    // =========================================================================
    // Carts
    // =========================================================================

    async fn get_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.working.cart_for(user_id))
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        // The transaction already holds the table lock
        Ok(self.working.cart_for(user_id))
    }

    async fn open_cart(&mut self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let t = &mut self.working;
        if let Some(cart) = t.cart_for(user_id) {
            return Ok(cart);
        }

        let cart = Cart {
            id: CartId::new(next(&mut t.seq.cart)),
            user_id,
        };
        t.carts.insert(cart.id, cart);
        Ok(cart)
    }

    async fn get_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        Ok(self
            .working
            .cart_items
            .values()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
            .copied())
    }

    async fn create_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        let t = &mut self.working;
        if t
            .cart_items
            .values()
            .any(|item| item.cart_id == cart_id && item.product_id == product_id)
        {
            return Err(RepositoryError::Conflict(
                "product is already in the cart".to_owned(),
            ));
        }

        let item = CartItem {
            id: CartItemId::new(next(&mut t.seq.cart_item)),
            cart_id,
            product_id,
            quantity,
        };
        t.cart_items.insert(item.id, item);
        Ok(item)
    }

    async fn set_cart_item_quantity(
        &mut self,
        id: CartItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let item = self
            .working
            .cart_items
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        Ok(())
    }

    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<(), RepositoryError> {
        self.working
            .cart_items
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let t = &self.working;
        t.cart_items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .map(|item| {
                let product = t.products.get(&item.product_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "cart item {} points at missing product {}",
                        item.id, item.product_id
                    ))
                })?;
                Ok(CartLine {
                    item: *item,
                    unit_price: product.price,
                })
            })
            .collect()
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let items = &mut self.working.cart_items;
        let before = items.len();
        items.retain(|_, item| item.cart_id != cart_id);
        Ok((before - items.len()) as u64)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn create_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let t = &mut self.working;
        let order = Order {
            id: OrderId::new(next(&mut t.seq.order)),
            user_id: order.user_id,
            items: order.items.clone(),
            total_price: order.total_price(),
            status: order.status,
            created_at: Utc::now(),
        };
        t.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn list_orders_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .working
            .orders
            .values()
            .rev()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let order = self
            .working
            .orders
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool, RepositoryError> {
        let t = &mut self.working;
        if t.orders.remove(&id).is_none() {
            return Ok(false);
        }
        t.admin_orders.retain(|_, order_id| *order_id != id);
        Ok(true)
    }

    async fn create_admin_order(&mut self, order: &Order) -> Result<AdminOrder, RepositoryError> {
        let t = &mut self.working;
        if !t.orders.contains_key(&order.id) {
            return Err(RepositoryError::NotFound);
        }
        if t.admin_orders.values().any(|id| *id == order.id) {
            return Err(RepositoryError::Conflict(
                "order already has an admin order".to_owned(),
            ));
        }

        let id = AdminOrderId::new(next(&mut t.seq.admin_order));
        t.admin_orders.insert(id, order.id);
        Ok(AdminOrder {
            id,
            order: order.clone(),
        })
    }

    async fn list_admin_orders(
        &mut self,
        page: PageRequest,
    ) -> Result<(Vec<AdminOrder>, u64), RepositoryError> {
        let t = &self.working;
        let admin_orders = paginate(t.admin_orders.iter().rev(), page)
            .into_iter()
            .map(|(id, order_id)| {
                let order = t.orders.get(order_id).cloned().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "admin order {id} points at missing order {order_id}"
                    ))
                })?;
                Ok(AdminOrder { id: *id, order })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok((admin_orders, t.admin_orders.len() as u64))
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    async fn latest_address(
        &mut self,
        profile_id: ProfileId,
    ) -> Result<Option<Address>, RepositoryError> {
        Ok(self
            .working
            .addresses
            .values()
            .rev()
            .find(|address| address.profile_id == profile_id)
            .cloned())
    }

    async fn get_address(&mut self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        Ok(self.working.addresses.get(&id).cloned())
    }

    async fn create_address(
        &mut self,
        profile_id: ProfileId,
        fields: &AddressFields,
    ) -> Result<Address, RepositoryError> {
        let t = &mut self.working;
        if !t.profiles.contains_key(&profile_id) {
            return Err(RepositoryError::NotFound);
        }

        let address = Address {
            id: AddressId::new(next(&mut t.seq.address)),
            profile_id,
            fields: fields.clone(),
        };
        t.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn update_address(&mut self, address: &Address) -> Result<(), RepositoryError> {
        let stored = self
            .working
            .addresses
            .get_mut(&address.id)
            .ok_or(RepositoryError::NotFound)?;
        *stored = address.clone();
        Ok(())
    }
}
