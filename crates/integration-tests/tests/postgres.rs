//! Store behavior against a real `PostgreSQL` database.
//!
//! These tests need `DATABASE_URL` pointing at a database the migrations can
//! run against. Every test works on its own freshly registered users and
//! products, so they can share one database and run in parallel.
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/bazaar_test \
//!     cargo test -p bazaar-integration-tests --test postgres -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use uuid::Uuid;

use bazaar_api::db::{create_pool, run_migrations};
use bazaar_api::models::NewProduct;
use bazaar_api::services::{CartService, OrderService, ServiceError};
use bazaar_api::store::{PgStore, Store};
use bazaar_core::{PageRequest, Price, ProductId, UserId, Username};

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL is set");
    let pool = create_pool(&SecretString::from(url))
        .await
        .expect("database is reachable");
    run_migrations(&pool).await.expect("migrations apply");
    PgStore::new(pool)
}

async fn seed_user(store: &PgStore, is_super_user: bool) -> UserId {
    let username = Username::parse(&format!("pg-{}", Uuid::new_v4().simple())).unwrap();
    let mut tx = store.begin().await.unwrap();
    let (user, _) = tx.create_user(&username, "hash").await.unwrap();
    tx.set_super_user(user.id, is_super_user).await.unwrap();
    tx.commit().await.unwrap();
    user.id
}

async fn seed_product(store: &PgStore, cents: i64) -> ProductId {
    let mut tx = store.begin().await.unwrap();
    let product = tx
        .create_product(&NewProduct {
            name: "Enamel mug".to_owned(),
            is_active: true,
            price: Price::from_cents(cents).unwrap(),
            description: "Camp mug".to_owned(),
            quantity: 100,
            is_listed: true,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    product.id
}

async fn cart_quantity(store: &PgStore, user: UserId, product: ProductId) -> u32 {
    CartService::new(store)
        .detail(user)
        .await
        .unwrap()
        .iter()
        .find(|line| line.item.product_id == product)
        .map_or(0, |line| line.item.quantity)
}

/// Run `n` cart adds for `user` at the same time; returns how many failed.
async fn add_concurrently(store: &PgStore, user: UserId, product: ProductId, n: usize) -> usize {
    let tasks: Vec<_> = (0..n)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { CartService::new(&store).add(user, product).await })
        })
        .collect();

    let mut failures = 0;
    for task in tasks {
        if task.await.unwrap().is_err() {
            failures += 1;
        }
    }
    failures
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires PostgreSQL at DATABASE_URL"]
async fn test_concurrent_adds_keep_every_increment() {
    let store = store().await;
    let user = seed_user(&store, false).await;
    let product = seed_product(&store, 250).await;

    CartService::new(&store).add(user, product).await.unwrap();
    assert_eq!(add_concurrently(&store, user, product, 20).await, 0);

    assert_eq!(cart_quantity(&store, user, product).await, 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires PostgreSQL at DATABASE_URL"]
async fn test_concurrent_first_adds_share_one_cart() {
    let store = store().await;
    let user = seed_user(&store, false).await;
    let product = seed_product(&store, 250).await;

    assert_eq!(add_concurrently(&store, user, product, 10).await, 0);

    assert_eq!(cart_quantity(&store, user, product).await, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires PostgreSQL at DATABASE_URL"]
async fn test_checkout_during_adds_loses_nothing() {
    let store = store().await;
    let user = seed_user(&store, false).await;
    let product = seed_product(&store, 100).await;
    CartService::new(&store).add(user, product).await.unwrap();

    let adding = {
        let store = store.clone();
        tokio::spawn(async move { add_concurrently(&store, user, product, 10).await })
    };
    let order = OrderService::new(&store, false).checkout(user).await.unwrap();
    assert_eq!(adding.await.unwrap(), 0);

    let ordered: u32 = order.items.iter().map(|item| item.quantity).sum();
    let left = cart_quantity(&store, user, product).await;
    assert_eq!(ordered + left, 11);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at DATABASE_URL"]
async fn test_checkout_empties_cart() {
    let store = store().await;
    let user = seed_user(&store, false).await;
    let product = seed_product(&store, 1000).await;
    let cart = CartService::new(&store);
    for _ in 0..3 {
        cart.add(user, product).await.unwrap();
    }

    let order = OrderService::new(&store, true).checkout(user).await.unwrap();
    assert_eq!(order.total_price.to_string(), "30.00");
    assert!(cart.detail(user).await.unwrap().is_empty());

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.get_product(product).await.unwrap().unwrap().quantity, 97);
    assert_eq!(tx.get_order(order.id).await.unwrap(), Some(order));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at DATABASE_URL"]
async fn test_checkout_of_large_cart() {
    let store = store().await;
    let user = seed_user(&store, false).await;
    let product = seed_product(&store, 9_999_999_999).await;
    let cart = CartService::new(&store);
    for _ in 0..101 {
        cart.add(user, product).await.unwrap();
    }

    let order = OrderService::new(&store, false).checkout(user).await.unwrap();
    assert_eq!(order.total_price.to_string(), "10099999998.99");

    let mut tx = store.begin().await.unwrap();
    let stored = tx.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.total_price, order.total_price);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL at DATABASE_URL"]
async fn test_admin_listing_pages_newest_first() {
    let store = store().await;
    let admin = seed_user(&store, true).await;
    let buyer = seed_user(&store, false).await;
    let product = seed_product(&store, 500).await;
    let orders = OrderService::new(&store, false);
    for _ in 0..11 {
        orders.buy_now(buyer, product).await.unwrap();
    }

    let first = orders.list_admin(admin, PageRequest::first()).await.unwrap();
    assert!(first.count >= 11);
    assert_eq!(first.results.len(), 10);
    assert_eq!(first.next.as_deref(), Some("?page=2"));
    assert!(
        first
            .results
            .windows(2)
            .all(|pair| matches!(pair, [a, b] if a.id > b.id))
    );

    assert!(matches!(
        orders.list_admin(buyer, PageRequest::first()).await,
        Err(ServiceError::PermissionDenied(_))
    ));
}
