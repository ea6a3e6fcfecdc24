//! Event endpoints.
//!
//! - `GET /api/events` - list events by date
//! - `GET /api/events/:id` - one event with its seat counts
//! - `POST /api/events` - create (admin)
//! - `PUT /api/events/:id` - update (admin)
//! - `DELETE /api/events/:id` - delete with its registrations (admin)

use super::{json_body, parse_id};
use crate::auth::RequireAdmin;
use crate::server::state::AppState;
use crate::types::{Event, EventDetails, EventId};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rsvp_web::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Event fields as submitted by the admin form.
///
/// Browsers send `date` from a `datetime-local` input (no zone, read as UTC)
/// and `capacity` as a string, so both are accepted loosely and validated
/// here.
#[derive(Debug, Default, Deserialize)]
pub struct EventRequest {
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD`
    pub date: Option<String>,
    /// Positive integer, as a number or a string
    pub capacity: Option<Value>,
    /// Location
    pub location: Option<String>,
}

impl EventRequest {
    /// Validate into [`EventDetails`].
    ///
    /// # Errors
    ///
    /// 400 `VALIDATION_ERROR` naming the first invalid field.
    pub fn into_details(self) -> Result<EventDetails, AppError> {
        let date = self
            .date
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| AppError::validation("date is required"))?;
        let date = parse_date(date)
            .ok_or_else(|| AppError::validation(format!("date '{date}' is not a valid date")))?;

        let capacity = self
            .capacity
            .as_ref()
            .and_then(parse_capacity)
            .ok_or_else(|| AppError::validation("capacity must be a positive integer"))?;

        EventDetails {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            date,
            capacity,
            location: self.location.unwrap_or_default(),
        }
        .validate()
        .map_err(AppError::validation)
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn parse_capacity(value: &Value) -> Option<u32> {
    let capacity = match value {
        Value::Number(number) => number.as_u64()?,
        Value::String(text) => text.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(capacity).ok().filter(|capacity| *capacity > 0)
}

/// An event with its current seat counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithSeats {
    /// The event
    #[serde(flatten)]
    pub event: Event,
    /// Confirmed registrations
    pub confirmed: u32,
    /// Free seats
    pub available: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all events, soonest first.
///
/// # Errors
///
/// 500 on store failure.
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, AppError> {
    Ok(Json(state.events.list().await?))
}

/// One event with confirmed and available seats.
///
/// # Errors
///
/// - 400 for a malformed id
/// - 404 if the event does not exist
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EventWithSeats>, AppError> {
    let id: EventId = parse_id(&id, "event")?;
    let current = state.capacity.report(id).await?;

    Ok(Json(EventWithSeats {
        event: current.event,
        confirmed: current.report.confirmed,
        available: current.report.available,
    }))
}

/// Create an event.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "Authorization: Bearer <token>" \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Rust Meetup", "description": "Talks", "date": "2026-06-15T18:00",
///        "capacity": "40", "location": "Berlin"}'
/// ```
///
/// # Errors
///
/// - 401/403 unless the caller is an admin
/// - 400 for invalid fields
pub async fn create_event(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let details = json_body(payload)?.into_details()?;
    let event = state.events.create(details).await?;

    tracing::info!(admin_id = %admin.user_id, event_id = %event.id, "Admin created event");
    Ok((StatusCode::CREATED, Json(event)))
}

/// Replace an event's fields.
///
/// # Errors
///
/// - 401/403 unless the caller is an admin
/// - 400 for invalid fields, or a capacity below the confirmed count
/// - 404 if the event does not exist
pub async fn update_event(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Json<Event>, AppError> {
    let id: EventId = parse_id(&id, "event")?;
    let details = json_body(payload)?.into_details()?;
    let event = state.events.update(id, details).await?;

    tracing::info!(admin_id = %admin.user_id, event_id = %id, "Admin updated event");
    Ok(Json(event))
}

/// Delete an event and its registrations.
///
/// # Errors
///
/// - 401/403 unless the caller is an admin
/// - 404 if the event does not exist
pub async fn delete_event(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id: EventId = parse_id(&id, "event")?;
    state.events.delete(id).await?;

    tracing::info!(admin_id = %admin.user_id, event_id = %id, "Admin deleted event");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(date: &str, capacity: Value) -> EventRequest {
        EventRequest {
            title: Some("Rust Meetup".to_string()),
            description: Some("Talks".to_string()),
            date: Some(date.to_string()),
            capacity: Some(capacity),
            location: Some("Berlin".to_string()),
        }
    }

    #[test]
    fn accepts_form_style_date_and_string_capacity() {
        let details = request("2026-06-15T18:00", json!("40")).into_details().unwrap();

        assert_eq!(details.capacity, 40);
        assert_eq!(details.date.to_rfc3339(), "2026-06-15T18:00:00+00:00");
    }

    #[test]
    fn accepts_rfc3339_with_offset() {
        let details = request("2026-06-15T20:00:00+02:00", json!(10)).into_details().unwrap();
        assert_eq!(details.date.to_rfc3339(), "2026-06-15T18:00:00+00:00");
    }

    #[test]
    fn rejects_bad_capacity_and_date() {
        for capacity in [json!(0), json!(-3), json!("lots"), json!(1.5), json!(null)] {
            let err = request("2026-06-15", capacity).into_details().unwrap_err();
            assert_eq!(err.code(), "VALIDATION_ERROR");
        }

        let err = request("next tuesday", json!(5)).into_details().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn missing_fields_are_named() {
        let err = EventRequest {
            date: Some("2026-06-15".to_string()),
            capacity: Some(json!(3)),
            ..EventRequest::default()
        }
        .into_details()
        .unwrap_err();
        assert_eq!(err.message(), "title is required");
    }
}
