//! Registration, login, refresh and bearer checks through the router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use bazaar_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_register_returns_profile_and_tokens() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/register/",
            None,
            Some(json!({ "username": "alice", "password": "secret1" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["is_super_user"], false);
    assert!(body["user"]["id"].is_number());
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
}

#[tokio::test]
async fn test_register_rejects_short_password_and_duplicates() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/register/",
            None,
            Some(json!({ "username": "alice", "password": "12345" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid username or password.");

    let (status, _) = app
        .post("/register/", None, Some(json!({ "password": "secret1" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.register("alice").await;
    let (status, body) = app
        .post(
            "/register/",
            None,
            Some(json!({ "username": "alice", "password": "another1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Username is already taken.");
}

#[tokio::test]
async fn test_login_and_refresh() {
    let app = TestApp::new();
    app.register("alice").await;

    let (status, body) = app
        .post(
            "/login/",
            None,
            Some(json!({ "username": "alice", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap().to_owned();
    let refresh = body["refresh"].as_str().unwrap().to_owned();

    let (status, _) = app.get("/user/profile/", Some(&access)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/token/refresh/", None, Some(json!({ "refresh": refresh })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["access"].as_str().unwrap();
    let (status, _) = app.get("/user/profile/", Some(fresh)).await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not a refresh token
    let (status, _) = app
        .post("/token/refresh/", None, Some(json!({ "refresh": access })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::new();
    app.register("alice").await;

    let (status, body) = app
        .post(
            "/login/",
            None,
            Some(json!({ "username": "alice", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "No active account found with the given credentials"
    );
}

#[tokio::test]
async fn test_authenticated_routes_require_a_valid_token() {
    let app = TestApp::new();

    let (status, body) = app.get("/cart/detail/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "Authentication credentials were not provided."
    );

    let (status, _) = app.get("/orders/", Some("not-a-real-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/products/add/", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let (status, _) = app.get("/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}
