//! Product endpoints through the router.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use bazaar_integration_tests::TestApp;

#[tokio::test]
async fn test_product_lifecycle() {
    let app = TestApp::new();
    let token = app.register("alice").await;

    let id = app.create_product(&token, "Lamp", "25.00", 3).await;

    let (status, body) = app.get(&format!("/products/{id}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Lamp");
    assert_eq!(body["price"], "25.00");
    assert_eq!(body["is_listed"], true);

    let (status, body) = app
        .put(
            &format!("/products/edit/{id}/"),
            Some(&token),
            json!({ "price": "19.99" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price"], "19.99");
    assert_eq!(body["name"], "Lamp");

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/products/toggle-listing/{id}/"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_listed"], false);

    let (status, body) = app
        .delete(&format!("/products/delete/{id}/"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = app.get(&format!("/products/{id}/"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Product not found.");
}

#[tokio::test]
async fn test_add_product_validation() {
    let app = TestApp::new();
    let token = app.register("alice").await;

    let (status, body) = app
        .post(
            "/products/add/",
            Some(&token),
            Some(json!({ "name": "Lamp", "description": "x", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "price: This field is required.");

    let (status, _) = app
        .post(
            "/products/add/",
            Some(&token),
            Some(json!({ "name": "Lamp", "price": "-1.00", "description": "x", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put("/products/edit/999/", Some(&token), json!({ "name": "Ghost" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_is_paginated_newest_first() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    for n in 0..12 {
        app.create_product(&token, &format!("Item {n}"), "1.00", 1)
            .await;
    }

    let (status, body) = app.get("/products/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 12);
    assert_eq!(body["next"], "?page=2");
    assert!(body["previous"].is_null());
    assert_eq!(body["results"].as_array().unwrap().len(), 10);
    assert_eq!(body["results"][0]["name"], "Item 11");

    let (status, body) = app.get("/products/?page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["previous"], "?page=1");
    assert!(body["next"].is_null());

    for page in ["3", "0", "abc"] {
        let (status, body) = app.get(&format!("/products/?page={page}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Invalid page.");
    }
}

#[tokio::test]
async fn test_product_images() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    let id = app.create_product(&token, "Lamp", "25.00", 3).await;

    let (status, body) = app
        .get(&format!("/product/{id}/image/single/"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "No image found for the product.");

    app.add_image(id, "product_images/lamp-front.jpg").await;
    app.add_image(id, "product_images/lamp-back.jpg").await;

    let (status, body) = app
        .get(&format!("/product/{id}/image/single/"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image"], "product_images/lamp-front.jpg");

    let (status, body) = app.get(&format!("/product/{id}/image/all/"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/product/999/image/all/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
