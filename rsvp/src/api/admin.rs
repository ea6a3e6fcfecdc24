//! Admin reporting endpoints.
//!
//! - `GET /api/admin/registrations[?eventId=]`
//! - `GET /api/admin/export` - CSV download

use super::parse_id;
use crate::auth::RequireAdmin;
use crate::reporting::EXPORT_FILE_NAME;
use crate::server::state::AppState;
use crate::store::RegistrationRecord;
use crate::types::EventId;
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use rsvp_web::{AppError, CorrelationId};
use serde::Deserialize;

/// Query parameters for the registration listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationsQuery {
    /// Restrict to one event
    pub event_id: Option<String>,
}

/// All registrations, newest first.
///
/// # Errors
///
/// - 401/403 unless the caller is an admin
/// - 400 for a malformed `eventId`
pub async fn list_registrations(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<RegistrationsQuery>,
) -> Result<Json<Vec<RegistrationRecord>>, AppError> {
    let event_id = query
        .event_id
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_id::<EventId>(raw, "event"))
        .transpose()?;

    let records = state.reports.list_registrations(event_id).await?;
    tracing::debug!(
        %correlation_id,
        admin_id = %admin.user_id,
        count = records.len(),
        "Registrations listed"
    );
    Ok(Json(records))
}

/// Every registration as a CSV attachment.
///
/// # Errors
///
/// 401/403 unless the caller is an admin.
pub async fn export(
    State(state): State<AppState>,
    CorrelationId(correlation_id): CorrelationId,
    RequireAdmin(admin): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    let csv = state.reports.export_csv().await?;
    tracing::info!(
        %correlation_id,
        admin_id = %admin.user_id,
        bytes = csv.len(),
        "Registrations exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={EXPORT_FILE_NAME}"),
            ),
        ],
        csv,
    ))
}
