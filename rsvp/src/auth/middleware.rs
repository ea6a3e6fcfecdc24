//! Authentication extractors.
//!
//! ```rust,ignore
//! // Any logged-in user
//! async fn register(Authenticated(principal): Authenticated) -> ... { }
//!
//! // Administrators only
//! async fn export(RequireAdmin(admin): RequireAdmin) -> ... { }
//! ```

use crate::server::state::AppState;
use crate::types::Principal;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use rsvp_web::{AppError, BearerToken};

/// The verified caller.
///
/// Rejects with 401 `AUTH_REQUIRED` when no bearer token is sent and 401
/// `AUTH_INVALID` when the token does not verify.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_headers(&parts.headers)?;

        let principal = state
            .identity
            .verify(&token)
            .map_err(|_| AppError::auth_invalid("Invalid or expired token"))?;

        Ok(Self(principal))
    }
}

/// A verified administrator.
///
/// Rejects like [`Authenticated`], plus 403 `FORBIDDEN` for non-admins.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Authenticated(principal) = Authenticated::from_request_parts(parts, state).await?;

        if !principal.is_admin() {
            tracing::debug!(user_id = %principal.user_id, "Admin route refused");
            return Err(AppError::forbidden("Forbidden. Admin access required."));
        }

        Ok(Self(principal))
    }
}
