//! Liveness endpoint.
//!
//! Used by load balancers and orchestrators to see that the process is
//! serving requests. It does not touch the database.

use axum::http::StatusCode;

/// `GET /health` → `200 ok`.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
