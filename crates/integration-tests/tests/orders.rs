//! Checkout, buy-now, order management and the admin listing.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use bazaar_integration_tests::TestApp;

#[tokio::test]
async fn test_checkout_empties_cart() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    let product = app.create_product(&token, "Teapot", "10.00", 5).await;
    for _ in 0..3 {
        app.post(&format!("/cart/add/{product}/"), Some(&token), None)
            .await;
    }

    let (status, order) = app.post("/cart/checkout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total_price"], "30.00");
    assert_eq!(order["status"], "CONFIRMED");
    assert_eq!(order["products"], json!([product]));
    assert_eq!(order["items"][0]["quantity"], 3);
    assert_eq!(order["items"][0]["price"], "10.00");

    let (_, items) = app.get("/cart/detail/", Some(&token)).await;
    assert!(items.as_array().unwrap().is_empty());

    let (status, body) = app.post("/cart/checkout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Cart is empty.");

    let (_, orders) = app.get("/orders/", Some(&token)).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_checkout_without_cart() {
    let app = TestApp::new();
    let token = app.register("alice").await;

    let (status, _) = app.post("/cart/checkout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_buy_now_and_create() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    let a = app.create_product(&token, "Cup", "2.00", 5).await;
    let b = app.create_product(&token, "Saucer", "1.25", 5).await;

    let (status, order) = app
        .post(&format!("/buy-now/{a}/"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total_price"], "2.00");

    let (status, order) = app
        .post(
            "/orders/create/",
            Some(&token),
            Some(json!({ "products": [a, b] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total_price"], "3.25");

    let (status, _) = app
        .post("/orders/create/", Some(&token), Some(json!({ "products": [] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/buy-now/999/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, orders) = app.get("/orders/", Some(&token)).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    // Newest first
    assert_eq!(orders.first().unwrap()["total_price"], "3.25");
}

#[tokio::test]
async fn test_change_status_rules() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let mallory = app.register("mallory").await;
    let product = app.create_product(&alice, "Cup", "2.00", 5).await;
    let (_, order) = app
        .post(&format!("/buy-now/{product}/"), Some(&alice), None)
        .await;
    let id = order["id"].as_i64().unwrap();
    let uri = format!("/orders/{id}/change-status/");

    for body in [json!({ "status": "DELIVERED" }), json!({ "status": "BOGUS" }), json!({})] {
        let (status, detail) = app.put(&uri, Some(&mallory), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            detail["detail"],
            "You do not have permission to change the status of this order."
        );
    }

    let (status, body) = app.put(&uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Status must be provided in the request data.");

    let (status, body) = app
        .put(&uri, Some(&alice), json!({ "status": "SHIPPED" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid status provided.");

    let (status, body) = app
        .put(&uri, Some(&alice), json!({ "status": "DELIVERED" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DELIVERED");

    let (status, _) = app
        .put("/orders/999/change-status/", Some(&alice), json!({ "status": "DELIVERED" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_order() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let mallory = app.register("mallory").await;
    let product = app.create_product(&alice, "Cup", "2.00", 5).await;
    let (_, order) = app
        .post(&format!("/buy-now/{product}/"), Some(&alice), None)
        .await;
    let uri = format!("/orders/{}/delete/", order["id"]);

    let (status, _) = app.delete(&uri, Some(&mallory)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&alice)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&uri, Some(&alice)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_listing() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let admin = app.register("admin").await;
    app.promote("admin").await;
    let product = app.create_product(&alice, "Cup", "2.00", 50).await;
    for _ in 0..11 {
        app.post(&format!("/buy-now/{product}/"), Some(&alice), None)
            .await;
    }

    let (status, body) = app.get("/admin/orders/", Some(&alice)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        "You do not have permission to access this resource."
    );
    assert!(body.get("results").is_none());

    let (status, body) = app.get("/admin/orders/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 11);
    assert_eq!(body["next"], "?page=2");
    assert_eq!(body["results"].as_array().unwrap().len(), 10);
    assert!(body["results"][0]["order"]["id"].is_number());

    let (status, body) = app.get("/admin/orders/?page=2", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stock_tracking() {
    let app = TestApp::with_stock_tracking();
    let token = app.register("alice").await;
    let product = app.create_product(&token, "Cup", "2.00", 2).await;
    for _ in 0..3 {
        app.post(&format!("/cart/add/{product}/"), Some(&token), None)
            .await;
    }

    let (status, _) = app.post("/cart/checkout/", Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get(&format!("/products/{product}/"), None).await;
    assert_eq!(body["quantity"], 0);
}
