//! Admin reporting: registration listing and CSV export.

use crate::store::{EventStore, RegistrationRecord, StoreError};
use crate::types::EventId;
use std::sync::Arc;

/// Header row of the export.
pub const EXPORT_HEADER: [&str; 6] = [
    "Event Title",
    "Event Date",
    "Event Location",
    "User Email",
    "Registration Status",
    "Registration Date",
];

/// File name offered for the export download.
pub const EXPORT_FILE_NAME: &str = "registrations-export.csv";

/// Read-only registration reports.
#[derive(Clone)]
pub struct RegistrationReports {
    store: Arc<dyn EventStore>,
}

impl RegistrationReports {
    /// Create a report source over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Registrations with user and event details, newest first, optionally
    /// for one event only.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_registrations(
        &self,
        event_id: Option<EventId>,
    ) -> Result<Vec<RegistrationRecord>, StoreError> {
        self.store.list_registrations(event_id).await
    }

    /// Every registration as a CSV document.
    ///
    /// Rows are ordered by event date, then newest registration first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn export_csv(&self) -> Result<String, StoreError> {
        let mut records = self.store.list_registrations(None).await?;
        records.sort_by(|a, b| {
            a.event
                .date
                .cmp(&b.event.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        tracing::debug!(rows = records.len(), "Exporting registrations");
        Ok(render_csv(&records))
    }
}

/// Render records in the given order.
#[must_use]
pub fn render_csv(records: &[RegistrationRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, EXPORT_HEADER);

    for record in records {
        let event_date = record.event.date.format("%Y-%m-%d").to_string();
        let registered = record.created_at.format("%Y-%m-%d").to_string();
        push_row(
            &mut out,
            [
                record.event.title.as_str(),
                event_date.as_str(),
                record.event.location.as_str(),
                record.user.email.as_str(),
                record.status.as_str(),
                registered.as_str(),
            ],
        );
    }

    out
}

fn push_row<const N: usize>(out: &mut String, fields: [&str; N]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push_str("\r\n");
}

/// RFC 4180: quote fields holding a separator, quote or line break.
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{RecordEvent, RecordUser};
    use crate::types::{RegistrationId, RegistrationStatus, UserId};
    use chrono::{TimeZone, Utc};

    fn record(title: &str, email: &str) -> RegistrationRecord {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 18, 30, 0).unwrap();
        RegistrationRecord {
            id: RegistrationId::new(),
            status: RegistrationStatus::Confirmed,
            created_at: at,
            updated_at: at,
            user: RecordUser { id: UserId::new(), email: email.to_string() },
            event: RecordEvent {
                id: EventId::new(),
                title: title.to_string(),
                date: at,
                location: "Berlin".to_string(),
            },
        }
    }

    #[test]
    fn header_comes_first() {
        let csv = render_csv(&[]);
        assert_eq!(
            csv,
            "Event Title,Event Date,Event Location,User Email,Registration Status,Registration Date\r\n"
        );
    }

    #[test]
    fn rows_use_short_dates_and_status() {
        let csv = render_csv(&[record("Rust Meetup", "ada@example.com")]);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "Rust Meetup,2025-03-14,Berlin,ada@example.com,CONFIRMED,2025-03-14");
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        let csv = render_csv(&[record("Talks, \"live\"", "ada@example.com")]);
        assert!(csv.contains("\"Talks, \"\"live\"\"\",2025-03-14"));

        let csv = render_csv(&[record("Day one\nDay two", "ada@example.com")]);
        assert!(csv.contains("\r\n\"Day one\nDay two\",2025-03-14,Berlin,"));
    }
}
