//! Domain types for event registration.
//!
//! Identifiers, the three entities (events, registrations, users) and the
//! validated input an administrator submits for an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an event
    EventId
}

uuid_id! {
    /// Unique identifier for a user
    UserId
}

uuid_id! {
    /// Unique identifier for a registration
    RegistrationId
}

// ============================================================================
// Enumerations
// ============================================================================

/// Error returned when a stored enum column holds an unknown value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Role of a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular attendee
    User,
    /// May manage events and view registration reports
    Admin,
}

impl Role {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(ParseEnumError { kind: "role", value: other.to_string() }),
        }
    }
}

/// Status of a registration.
///
/// A registration row is never deleted when a user cancels; the status flips
/// and the same row is reused if they register again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistrationStatus {
    /// Holds a seat
    Confirmed,
    /// Kept for history; holds no seat
    Cancelled,
}

impl RegistrationStatus {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParseEnumError { kind: "registration status", value: other.to_string() }),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// An event users can register for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Maximum number of confirmed registrations
    pub capacity: u32,
    /// Venue or link
    pub location: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Build a new event from validated details.
    #[must_use]
    pub fn new(details: EventDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            title: details.title,
            description: details.description,
            date: details.date,
            capacity: details.capacity,
            location: details.location,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields.
    pub fn apply(&mut self, details: EventDetails, now: DateTime<Utc>) {
        self.title = details.title;
        self.description = details.description;
        self.date = details.date;
        self.capacity = details.capacity;
        self.location = details.location;
        self.updated_at = now;
    }
}

/// Editable fields of an event, as submitted by an administrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Maximum number of confirmed registrations
    pub capacity: u32,
    /// Venue or link
    pub location: String,
}

impl EventDetails {
    /// Check required fields, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(mut self) -> Result<Self, String> {
        for (field, value) in [
            ("title", &mut self.title),
            ("description", &mut self.description),
            ("location", &mut self.location),
        ] {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(format!("{field} is required"));
            }
            *value = trimmed.to_string();
        }

        if self.capacity == 0 {
            return Err("capacity must be a positive integer".to_string());
        }

        Ok(self)
    }
}

/// One user's registration for one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Registration ID
    pub id: RegistrationId,
    /// Event
    pub event_id: EventId,
    /// User
    pub user_id: UserId,
    /// Current status
    pub status: RegistrationStatus,
    /// First registration time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// A fresh confirmed registration.
    #[must_use]
    pub fn confirmed(event_id: EventId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: RegistrationId::new(),
            event_id,
            user_id,
            status: RegistrationStatus::Confirmed,
            created_at: now,
            updated_at: now,
        }
    }

    /// This registration with a new status, keeping its identity.
    #[must_use]
    pub fn with_status(mut self, status: RegistrationStatus, now: DateTime<Utc>) -> Self {
        self.status = status;
        self.updated_at = now;
        self
    }

    /// `true` when the registration holds a seat.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == RegistrationStatus::Confirmed
    }
}

/// A user account.
///
/// Never serialized directly; responses use [`UserSummary`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// User ID
    pub id: UserId,
    /// Unique, lowercase email
    pub email: String,
    /// PHC-format password hash
    pub password_hash: String,
    /// Role
    pub role: Role,
    /// Sign-up time
    pub created_at: DateTime<Utc>,
}

/// Public view of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User ID
    pub id: UserId,
    /// Email
    pub email: String,
    /// Role
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// The verified identity behind a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    /// Authenticated user
    pub user_id: UserId,
    /// Role carried by the credential
    pub role: Role,
}

impl Principal {
    /// `true` for administrators.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn details() -> EventDetails {
        EventDetails {
            title: "  Rust Meetup ".to_string(),
            description: "Talks".to_string(),
            date: Utc::now(),
            capacity: 10,
            location: "Berlin".to_string(),
        }
    }

    #[test]
    fn validate_trims_text_fields() {
        let valid = details().validate().unwrap();
        assert_eq!(valid.title, "Rust Meetup");
    }

    #[test]
    fn validate_rejects_blank_fields_and_zero_capacity() {
        let mut blank = details();
        blank.location = "   ".to_string();
        assert_eq!(blank.validate().unwrap_err(), "location is required");

        let mut empty = details();
        empty.capacity = 0;
        assert_eq!(empty.validate().unwrap_err(), "capacity must be a positive integer");
    }

    #[test]
    fn enums_round_trip_through_storage_strings() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        for status in [RegistrationStatus::Confirmed, RegistrationStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<RegistrationStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<RegistrationStatus>().is_err());
    }

    #[test]
    fn registration_json_uses_camel_case_and_upper_status() {
        let registration = Registration::confirmed(EventId::new(), UserId::new(), Utc::now());
        let json = serde_json::to_value(&registration).unwrap();

        assert_eq!(json["status"], "CONFIRMED");
        assert_eq!(json["eventId"], registration.event_id.to_string());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn with_status_keeps_identity() {
        let registration = Registration::confirmed(EventId::new(), UserId::new(), Utc::now());
        let cancelled = registration.clone().with_status(RegistrationStatus::Cancelled, Utc::now());

        assert_eq!(cancelled.id, registration.id);
        assert!(!cancelled.is_confirmed());
    }
}
