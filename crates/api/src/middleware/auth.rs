//! Bearer token authentication extractor.
//!
//! Authenticated routes take a [`RequireAuth`] argument. The extractor reads
//! `Authorization: Bearer <access token>`, resolves it through the auth
//! service and rejects the request with 401 when the header is missing or the
//! token is unknown or expired.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::state::AppState;

const NO_CREDENTIALS: &str = "Authentication credentials were not provided.";

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized(NO_CREDENTIALS.to_owned()))?;

        // The lookup's transaction ends here, before the handler opens its own
        let user = state.auth().authenticate(token).await?;

        tracing::Span::current().record("user_id", user.id.as_i32());
        set_sentry_user(&user.id, user.username.as_str());

        Ok(Self(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
