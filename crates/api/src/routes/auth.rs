//! Registration, login and token refresh handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::routes::account::ProfileView;
use crate::state::AppState;

/// Register request body. Missing fields are treated as empty.
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: ProfileView,
    pub access_token: String,
    pub refresh_token: String,
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Create an account and return its profile with a token pair.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = body?;
    let registration = state
        .auth()
        .register(&request.username, &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: registration.profile.into(),
            access_token: registration.tokens.access,
            refresh_token: registration.tokens.refresh,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(request) = body?;
    let tokens = state
        .auth()
        .login(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

/// Exchange a refresh token for a fresh access token.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    body: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>> {
    let Json(request) = body?;
    let access = state.auth().refresh(&request.refresh).await?;
    Ok(Json(RefreshResponse { access }))
}
