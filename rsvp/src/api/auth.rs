//! Account endpoints.
//!
//! - `POST /api/auth/register` - sign up, returns `{token, user}`
//! - `POST /api/auth/login` - log in, returns `{token, user}`

use super::json_body;
use crate::auth::AuthSession;
use crate::server::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use rsvp_web::AppError;
use serde::Deserialize;

/// Email and password.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    /// Email
    #[serde(default)]
    pub email: String,
    /// Password
    #[serde(default)]
    pub password: String,
}

/// Create a USER account.
///
/// # Errors
///
/// 400 `VALIDATION_ERROR` for blank fields or a taken email.
pub async fn sign_up(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthSession>, AppError> {
    let request = json_body(payload)?;
    Ok(Json(state.accounts.sign_up(&request.email, &request.password).await?))
}

/// Log in.
///
/// # Errors
///
/// 401 `AUTH_INVALID` for an unknown email or a wrong password.
pub async fn log_in(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthSession>, AppError> {
    let request = json_body(payload)?;
    Ok(Json(state.accounts.log_in(&request.email, &request.password).await?))
}
