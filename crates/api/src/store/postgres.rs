//! `PostgreSQL` store backend.
//!
//! Queries are checked at runtime (`query_as` with `FromRow` row structs) so
//! the crate builds without a live database. Row structs convert to domain
//! types via `TryFrom`, reporting invalid stored data as
//! `RepositoryError::DataCorruption`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use bazaar_core::{
    AddressId, AdminOrderId, CartId, CartItemId, OrderId, OrderStatus, PageRequest, Price,
    ProductId, ProductImageId, ProfileId, UserId, Username,
};

use super::{Store, StoreTx};
use crate::db::RepositoryError;
use crate::models::{
    Address, AddressFields, AdminOrder, Cart, CartItem, CartLine, NewOrder, NewProduct, NewToken,
    Order, OrderItem, Product, ProductImage, TokenKind, TokenRecord, User, UserProfile,
};

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// A `PostgreSQL` transaction. Rolled back by sqlx when dropped uncommitted.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

// =============================================================================
// Row types
// =============================================================================

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    username: Username,
    date_joined: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            date_joined: row.date_joined,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(FromRow)]
struct ProfileRow {
    id: ProfileId,
    user_id: UserId,
    is_super_user: bool,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            is_super_user: row.is_super_user,
        }
    }
}

#[derive(FromRow)]
struct TokenRow {
    user_id: UserId,
    kind: String,
    expires_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = RepositoryError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let kind = match row.kind.as_str() {
            "access" => TokenKind::Access,
            "refresh" => TokenKind::Refresh,
            other => {
                return Err(RepositoryError::DataCorruption(format!(
                    "invalid token kind in database: {other}"
                )));
            }
        };

        Ok(Self {
            user_id: row.user_id,
            kind,
            expires_at: row.expires_at,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    is_active: bool,
    price: Price,
    description: String,
    quantity: i32,
    is_listed: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            is_active: row.is_active,
            price: row.price,
            description: row.description,
            quantity: quantity_from_db(row.quantity, "product")?,
            is_listed: row.is_listed,
        })
    }
}

#[derive(FromRow)]
struct ImageRow {
    id: ProductImageId,
    product_id: ProductId,
    image: String,
}

impl From<ImageRow> for ProductImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            image: row.image,
        }
    }
}

#[derive(FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
        }
    }
}

#[derive(FromRow)]
struct CartItemRow {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: quantity_from_db(row.quantity, "cart item")?,
        })
    }
}

#[derive(FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    item: CartItemRow,
    unit_price: Price,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item: row.item.try_into()?,
            unit_price: row.unit_price,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    total_price: Price,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct OrderItemRow {
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    unit_price: Price,
}

#[derive(FromRow)]
struct AdminOrderRow {
    id: AdminOrderId,
    order_id: OrderId,
}

#[derive(FromRow)]
struct AddressRow {
    id: AddressId,
    user_profile_id: ProfileId,
    address: String,
    phone_number: String,
    city: String,
    district: String,
    state: String,
    country: String,
    pincode: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            profile_id: row.user_profile_id,
            fields: AddressFields {
                address: row.address,
                phone_number: row.phone_number,
                city: row.city,
                district: row.district,
                state: row.state,
                country: row.country,
                pincode: row.pincode,
            },
        }
    }
}

fn quantity_from_db(quantity: i32, table: &str) -> Result<u32, RepositoryError> {
    u32::try_from(quantity).map_err(|_| {
        RepositoryError::DataCorruption(format!("negative quantity in {table}: {quantity}"))
    })
}

fn quantity_to_db(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} is out of range")))
}

fn page_bounds(page: PageRequest) -> (i64, i64) {
    (
        i64::try_from(page.limit()).unwrap_or(i64::MAX),
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    )
}

fn count_from_db(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

const PRODUCT_COLUMNS: &str = "id, name, is_active, price, description, quantity, is_listed";
const ADDRESS_COLUMNS: &str =
    "id, user_profile_id, address, phone_number, city, district, state, country, pincode";

impl PgTx {
    /// Load the items of `rows` and assemble orders in row order.
    async fn attach_items(&mut self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|row| row.id.as_i32()).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, quantity, unit_price
            FROM bazaar.order_item
            WHERE order_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.order_id).or_default().push(OrderItem {
                product_id: row.product_id,
                quantity: quantity_from_db(row.quantity, "order item")?,
                unit_price: row.unit_price,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Order {
                items: items.remove(&row.id).unwrap_or_default(),
                id: row.id,
                user_id: row.user_id,
                total_price: row.total_price,
                status: row.status,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
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
        let user = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO bazaar.user (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, date_joined
            ",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "username already exists"))?;

        let profile = sqlx::query_as::<_, ProfileRow>(
            r"
            INSERT INTO bazaar.user_profile (user_id)
            VALUES ($1)
            RETURNING id, user_id, is_super_user
            ",
        )
        .bind(user.id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok((user.into(), profile.into()))
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, date_joined FROM bazaar.user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_user_credentials(
        &mut self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            r"
            SELECT id, username, date_joined, password_hash
            FROM bazaar.user
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| (r.user.into(), r.password_hash)))
    }

    async fn get_profile(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, user_id, is_super_user FROM bazaar.user_profile WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(UserProfile::from))
    }

    async fn set_super_user(
        &mut self,
        user_id: UserId,
        is_super_user: bool,
    ) -> Result<UserProfile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            UPDATE bazaar.user_profile
            SET is_super_user = $2
            WHERE user_id = $1
            RETURNING id, user_id, is_super_user
            ",
        )
        .bind(user_id)
        .bind(is_super_user)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    async fn insert_token(&mut self, token: &NewToken) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bazaar.auth_token (user_id, digest, kind, expires_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(token.user_id)
        .bind(&token.digest)
        .bind(token.kind.as_str())
        .bind(token.expires_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "token digest already exists"))?;

        Ok(())
    }

    async fn find_token(
        &mut self,
        digest: &str,
        kind: TokenKind,
    ) -> Result<Option<TokenRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, TokenRow>(
            r"
            SELECT user_id, kind, expires_at
            FROM bazaar.auth_token
            WHERE digest = $1 AND kind = $2
            ",
        )
        .bind(digest)
        .bind(kind.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(TokenRecord::try_from).transpose()
    }

    async fn delete_expired_tokens(&mut self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.auth_token WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn list_products(
        &mut self,
        page: PageRequest,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bazaar.product")
            .fetch_one(&mut *self.tx)
            .await?;

        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product ORDER BY id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        let products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((products, count_from_db(count)))
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM bazaar.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn create_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO bazaar.product (name, is_active, price, description, quantity, is_listed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&product.name)
        .bind(product.is_active)
        .bind(product.price)
        .bind(&product.description)
        .bind(quantity_to_db(product.quantity)?)
        .bind(product.is_listed)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn update_product(&mut self, product: &Product) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE bazaar.product
            SET name = $2, is_active = $3, price = $4, description = $5,
                quantity = $6, is_listed = $7
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(product.is_active)
        .bind(product.price)
        .bind(&product.description)
        .bind(quantity_to_db(product.quantity)?)
        .bind(product.is_listed)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.product WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn decrement_stock(&mut self, id: ProductId, by: u32) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE bazaar.product SET quantity = GREATEST(quantity - $2, 0) WHERE id = $1",
        )
        .bind(id)
        .bind(quantity_to_db(by)?)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_product_images(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r"
            SELECT id, product_id, image
            FROM bazaar.product_image
            WHERE product_id = $1
            ORDER BY id
            ",
        )
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(ProductImage::from).collect())
    }

    async fn add_product_image(
        &mut self,
        product_id: ProductId,
        image: &str,
    ) -> Result<ProductImage, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(
            r"
            INSERT INTO bazaar.product_image (product_id, image)
            VALUES ($1, $2)
            RETURNING id, product_id, image
            ",
        )
        .bind(product_id)
        .bind(image)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    // =========================================================================
    // Carts
    // =========================================================================

    async fn get_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row =
            sqlx::query_as::<_, CartRow>("SELECT id, user_id FROM bazaar.cart WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(row.map(Cart::from))
    }

    async fn lock_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id FROM bazaar.cart WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Cart::from))
    }

    async fn open_cart(&mut self, user_id: UserId) -> Result<Cart, RepositoryError> {
        // Waits on a concurrent uncommitted insert instead of failing on it
        sqlx::query(
            r"
            INSERT INTO bazaar.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        let row = sqlx::query_as::<_, CartRow>(
            "SELECT id, user_id FROM bazaar.cart WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn get_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, cart_id, product_id, quantity
            FROM bazaar.cart_item
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(CartItem::try_from).transpose()
    }

    async fn create_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r"
            INSERT INTO bazaar.cart_item (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, cart_id, product_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity_to_db(quantity)?)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "product is already in the cart"))?;

        row.try_into()
    }

    async fn set_cart_item_quantity(
        &mut self,
        id: CartItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bazaar.cart_item SET quantity = $2 WHERE id = $1")
            .bind(id)
            .bind(quantity_to_db(quantity)?)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_cart_item(&mut self, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.cart_item WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, p.price AS unit_price
            FROM bazaar.cart_item ci
            JOIN bazaar.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(CartLine::try_from).collect()
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.cart_item WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    async fn create_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO bazaar.order (user_id, total_price, status)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, total_price, status, created_at
            ",
        )
        .bind(order.user_id)
        .bind(order.total_price())
        .bind(order.status)
        .fetch_one(&mut *self.tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO bazaar.order_item (order_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(quantity_to_db(item.quantity)?)
            .bind(item.unit_price)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            items: order.items.clone(),
            total_price: row.total_price,
            status: row.status,
            created_at: row.created_at,
        })
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total_price, status, created_at
            FROM bazaar.order
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_orders_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total_price, status, created_at
            FROM bazaar.order
            WHERE user_id = $1
            ORDER BY id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        self.attach_items(rows).await
    }

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bazaar.order SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool, RepositoryError> {
        // Items and the admin wrapper go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM bazaar.order WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_admin_order(&mut self, order: &Order) -> Result<AdminOrder, RepositoryError> {
        let row = sqlx::query_as::<_, AdminOrderRow>(
            "INSERT INTO bazaar.admin_order (order_id) VALUES ($1) RETURNING id, order_id",
        )
        .bind(order.id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "order already has an admin order"))?;

        Ok(AdminOrder {
            id: row.id,
            order: order.clone(),
        })
    }

    async fn list_admin_orders(
        &mut self,
        page: PageRequest,
    ) -> Result<(Vec<AdminOrder>, u64), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bazaar.admin_order")
            .fetch_one(&mut *self.tx)
            .await?;

        let (limit, offset) = page_bounds(page);
        let admin_rows = sqlx::query_as::<_, AdminOrderRow>(
            r"
            SELECT id, order_id
            FROM bazaar.admin_order
            ORDER BY id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        let order_ids: Vec<i32> = admin_rows.iter().map(|row| row.order_id.as_i32()).collect();
        let order_rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, user_id, total_price, status, created_at
            FROM bazaar.order
            WHERE id = ANY($1)
            ",
        )
        .bind(&order_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut orders: HashMap<OrderId, Order> = self
            .attach_items(order_rows)
            .await?
            .into_iter()
            .map(|order| (order.id, order))
            .collect();

        let admin_orders = admin_rows
            .into_iter()
            .map(|row| {
                let order = orders.remove(&row.order_id).ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "admin order {} points at missing order {}",
                        row.id, row.order_id
                    ))
                })?;
                Ok(AdminOrder { id: row.id, order })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok((admin_orders, count_from_db(count)))
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    async fn latest_address(
        &mut self,
        profile_id: ProfileId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            SELECT {ADDRESS_COLUMNS}
            FROM bazaar.address
            WHERE user_profile_id = $1
            ORDER BY id DESC
            LIMIT 1
            "
        ))
        .bind(profile_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Address::from))
    }

    async fn get_address(&mut self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM bazaar.address WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Address::from))
    }

    async fn create_address(
        &mut self,
        profile_id: ProfileId,
        fields: &AddressFields,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            INSERT INTO bazaar.address
                (user_profile_id, address, phone_number, city, district, state, country, pincode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(profile_id)
        .bind(&fields.address)
        .bind(&fields.phone_number)
        .bind(&fields.city)
        .bind(&fields.district)
        .bind(&fields.state)
        .bind(&fields.country)
        .bind(&fields.pincode)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn update_address(&mut self, address: &Address) -> Result<(), RepositoryError> {
        let fields = &address.fields;
        let result = sqlx::query(
            r"
            UPDATE bazaar.address
            SET address = $2, phone_number = $3, city = $4, district = $5,
                state = $6, country = $7, pincode = $8
            WHERE id = $1
            ",
        )
        .bind(address.id)
        .bind(&fields.address)
        .bind(&fields.phone_number)
        .bind(&fields.city)
        .bind(&fields.district)
        .bind(&fields.state)
        .bind(&fields.country)
        .bind(&fields.pincode)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
