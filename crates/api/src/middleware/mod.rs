//! HTTP middleware for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (propagate or create `x-request-id`)
//!
//! Authentication is not a layer: handlers opt in with the [`RequireAuth`]
//! extractor.

pub mod auth;
pub mod request_id;

pub use auth::RequireAuth;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
