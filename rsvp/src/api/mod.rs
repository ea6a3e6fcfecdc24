//! HTTP API handlers, grouped by audience:
//!
//! - [`events`]: public catalog and admin event CRUD
//! - [`registrations`]: register and cancel (authenticated)
//! - [`admin`]: registration listing and CSV export (admin)
//! - [`auth`]: sign-up and log-in

use axum::extract::rejection::JsonRejection;
use axum::Json;
use rsvp_web::AppError;
use std::str::FromStr;

pub mod admin;
pub mod auth;
pub mod events;
pub mod registrations;

/// Parse an identifier from a path segment or query value.
///
/// # Errors
///
/// 400 `VALIDATION_ERROR` when `raw` is not a valid identifier.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::validation(format!("Invalid {what} id '{raw}'")))
}

/// Unwrap a JSON body, turning axum's plain-text rejection into a
/// `VALIDATION_ERROR`.
///
/// # Errors
///
/// 400 `VALIDATION_ERROR` when the body is missing or malformed.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}
