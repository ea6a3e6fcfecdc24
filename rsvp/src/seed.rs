//! Demo data.
//!
//! Creates the administrator account and, when the catalog is empty, four
//! sample events. Running it again changes nothing.

use crate::auth::{AccountService, AuthError};
use crate::management::{EventManager, ManagementError};
use crate::types::{EventDetails, Role};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Seeding failures.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Creating or looking up the administrator failed.
    #[error("admin account: {0}")]
    Admin(#[from] AuthError),

    /// Creating an event failed.
    #[error("demo events: {0}")]
    Events(#[from] ManagementError),

    /// A built-in event date does not parse.
    #[error("demo event date: {0}")]
    Date(#[from] chrono::ParseError),
}

/// What a seeding run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// The administrator did not exist and was created
    pub admin_created: bool,
    /// Demo events created
    pub events_created: usize,
}

const DEMO_EVENTS: [(&str, &str, &str, u32, &str); 4] = [
    (
        "Global Tech Conference 2026",
        "A gathering of tech enthusiasts globally discussing future innovations.",
        "2026-06-15T09:00:00Z",
        500,
        "San Francisco, CA Convention Center",
    ),
    (
        "Startups & Investors Meetup",
        "A networking event to connect ambitious founders with angel investors.",
        "2026-07-20T18:00:00Z",
        100,
        "New York, NY - The Grand Hotel",
    ),
    (
        "Web Development Workshop",
        "A hands-on workshop focused on modern React and containerization.",
        "2026-08-05T10:00:00Z",
        50,
        "Online via Zoom",
    ),
    (
        "AI in Enterprise Summit",
        "Discover how AI is reshaping traditional enterprise workflows.",
        "2026-09-10T09:30:00Z",
        250,
        "London, UK - ExCeL Centre",
    ),
];

/// The built-in sample events.
///
/// # Errors
///
/// Returns [`SeedError::Date`] if a built-in date fails to parse.
pub fn demo_events() -> Result<Vec<EventDetails>, SeedError> {
    DEMO_EVENTS
        .iter()
        .map(|&(title, description, date, capacity, location)| {
            Ok(EventDetails {
                title: title.to_string(),
                description: description.to_string(),
                date: DateTime::parse_from_rfc3339(date)?.with_timezone(&Utc),
                capacity,
                location: location.to_string(),
            })
        })
        .collect()
}

/// Ensure the administrator and the demo catalog exist.
///
/// # Errors
///
/// Returns [`SeedError`] on store or validation failure.
pub async fn seed(
    accounts: &AccountService,
    events: &EventManager,
    admin_email: &str,
    admin_password: &str,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    if let Some(admin) = accounts.find_by_email(admin_email).await? {
        tracing::info!(user_id = %admin.id, "Admin user already exists");
    } else {
        let admin = accounts.provision(admin_email, admin_password, Role::Admin).await?;
        tracing::info!(user_id = %admin.id, email = %admin.email, "Admin user created");
        report.admin_created = true;
    }

    if events.list().await?.is_empty() {
        for details in demo_events()? {
            let event = events.create(details).await?;
            tracing::debug!(event_id = %event.id, title = %event.title, "Demo event created");
            report.events_created += 1;
        }
        tracing::info!(count = report.events_created, "Demo events created");
    } else {
        tracing::info!("Event catalog not empty, skipping demo events");
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::JwtIdentityProvider;
    use crate::store::InMemoryStore;
    use rsvp_testing::test_clock;
    use std::sync::Arc;

    fn services() -> (AccountService, EventManager) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(test_clock());
        let identity = Arc::new(JwtIdentityProvider::new(
            b"seed-test-secret",
            chrono::Duration::hours(1),
            clock.clone(),
        ));
        (
            AccountService::new(store.clone(), identity, clock.clone()),
            EventManager::new(store, clock),
        )
    }

    #[test]
    fn demo_events_are_valid() {
        let events = demo_events().unwrap();
        assert_eq!(events.len(), 4);
        for details in events {
            details.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn seeding_twice_is_a_no_op() {
        let (accounts, events) = services();

        let first = seed(&accounts, &events, "Admin@Example.com", "admin123").await.unwrap();
        assert_eq!(first, SeedReport { admin_created: true, events_created: 4 });

        let second = seed(&accounts, &events, "admin@example.com", "admin123").await.unwrap();
        assert_eq!(second, SeedReport::default());

        let admin = accounts.find_by_email("admin@example.com").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(events.list().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn seeded_admin_can_log_in() {
        let (accounts, events) = services();
        seed(&accounts, &events, "admin@example.com", "admin123").await.unwrap();

        let session = accounts.log_in("admin@example.com", "admin123").await.unwrap();
        assert_eq!(session.user.role, Role::Admin);
    }
}
