//! Registration endpoints.
//!
//! - `POST /api/events/:id/register` - 201 for a new registration, 200 when
//!   a cancelled one is reactivated
//! - `DELETE /api/events/:id/register` - cancel

use super::parse_id;
use crate::auth::Authenticated;
use crate::server::state::AppState;
use crate::types::{EventId, Registration};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rsvp_web::{AppError, CorrelationId};

/// Register the caller for an event.
///
/// # Errors
///
/// - 401 without a valid credential
/// - 404 if the event does not exist
/// - 400 `CAPACITY_EXCEEDED` / `ALREADY_REGISTERED`
/// - 500 `TRANSIENT` if the registration kept losing races
pub async fn register(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let event_id: EventId = parse_id(&id, "event")?;
    let outcome = state.engine.register(event_id, principal.user_id).await?;
    tracing::info!(
        %correlation_id,
        %event_id,
        user_id = %principal.user_id,
        registration_id = %outcome.registration.id,
        created = outcome.created,
        "Registration confirmed"
    );

    let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(outcome.registration)))
}

/// Cancel the caller's registration. Cancelling twice is not an error.
///
/// # Errors
///
/// - 401 without a valid credential
/// - 404 if the caller has no registration for the event
pub async fn cancel(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Registration>, AppError> {
    let event_id: EventId = parse_id(&id, "event")?;
    let registration = state.engine.cancel(event_id, principal.user_id).await?;
    tracing::info!(
        %correlation_id,
        %event_id,
        user_id = %principal.user_id,
        registration_id = %registration.id,
        "Registration cancelled"
    );
    Ok(Json(registration))
}
