//! Persistence contract for events, registrations and users.
//!
//! The traits return boxed futures so they stay dyn-compatible and can be
//! shared as `Arc<dyn EventStore>` between the engine, the services and the
//! HTTP layer.
//!
//! # Seat accounting
//!
//! Every event carries a registration version. [`EventStore::load_ledger`]
//! returns it together with the confirmed count, and
//! [`EventStore::commit`] only applies a registration write if the version
//! is still the one that was read, bumping it on success. Any registration
//! write or capacity change in between makes the commit fail with
//! [`StoreError::Conflict`], so a capacity decision is never applied on stale
//! data.

use crate::types::{
    Event, EventDetails, EventId, Registration, RegistrationId, RegistrationStatus, User, UserId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors raised by store implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The event's registration version moved since it was read.
    #[error("registration version of event {event_id} is no longer {expected}")]
    Conflict {
        /// Event whose version moved
        event_id: EventId,
        /// Version the writer expected
        expected: i64,
    },

    /// A registration names a user with no account.
    #[error("user {0} does not exist")]
    UnknownUser(UserId),

    /// A user with this email already exists.
    #[error("email {0} already in use")]
    DuplicateEmail(String),

    /// Capacity update would leave more confirmed registrations than seats.
    #[error("capacity {capacity} is below the {confirmed} confirmed registrations")]
    CapacityBelowConfirmed {
        /// Requested capacity
        capacity: u32,
        /// Confirmed registrations at the time
        confirmed: u32,
    },

    /// Backend failure.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub(crate) fn event_not_found(id: EventId) -> Self {
        Self::NotFound { entity: "Event", id: id.to_string() }
    }
}

/// Everything a registration decision needs, read at one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLedger {
    /// The event, including its capacity
    pub event: Event,
    /// CONFIRMED registrations for the event
    pub confirmed: u32,
    /// Registration version the snapshot was read at
    pub version: i64,
    /// The requesting user's registration for this event, any status
    pub registration: Option<Registration>,
}

impl SeatLedger {
    /// `true` when no seat is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.confirmed >= self.event.capacity
    }
}

/// A registration write, applied by [`EventStore::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationWrite {
    /// Insert a new row.
    Insert(Registration),
    /// Change the status of an existing row.
    UpdateStatus(Registration),
}

impl RegistrationWrite {
    /// The registration as it will be stored.
    #[must_use]
    pub const fn registration(&self) -> &Registration {
        match self {
            Self::Insert(registration) | Self::UpdateStatus(registration) => registration,
        }
    }
}

/// A registration joined with its user and event, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    /// Registration ID
    pub id: RegistrationId,
    /// Status
    pub status: RegistrationStatus,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
    /// Registered user
    pub user: RecordUser,
    /// Event registered for
    pub event: RecordEvent,
}

/// User columns of a [`RegistrationRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordUser {
    /// User ID
    pub id: UserId,
    /// Email
    pub email: String,
}

/// Event columns of a [`RegistrationRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordEvent {
    /// Event ID
    pub id: EventId,
    /// Title
    pub title: String,
    /// Date
    pub date: DateTime<Utc>,
    /// Location
    pub location: String,
}

/// Storage for events and registrations.
pub trait EventStore: Send + Sync {
    /// Insert a new event.
    fn create_event(&self, event: Event) -> StoreFuture<'_, Event>;

    /// Fetch an event.
    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// All events, ordered by date ascending.
    fn list_events(&self) -> StoreFuture<'_, Vec<Event>>;

    /// Replace an event's editable fields and bump its registration version.
    ///
    /// Fails with [`StoreError::CapacityBelowConfirmed`] when the new capacity
    /// is smaller than the current confirmed count.
    fn update_event(
        &self,
        id: EventId,
        details: EventDetails,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Event>;

    /// Delete an event's registrations, then the event, atomically.
    ///
    /// Returns how many registrations were removed.
    fn delete_event(&self, id: EventId) -> StoreFuture<'_, u64>;

    /// Number of CONFIRMED registrations for an event.
    fn count_confirmed(&self, event_id: EventId) -> StoreFuture<'_, u32>;

    /// Fetch a registration by ID.
    fn get_registration(&self, id: RegistrationId) -> StoreFuture<'_, Option<Registration>>;

    /// Fetch the registration for a (user, event) pair, any status.
    fn find_registration(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> StoreFuture<'_, Option<Registration>>;

    /// Read the seat ledger for a registration decision.
    fn load_ledger(&self, event_id: EventId, user_id: UserId) -> StoreFuture<'_, SeatLedger>;

    /// Apply `write` if the event's registration version is still
    /// `expected_version`, bumping the version.
    ///
    /// An insert for a user without an account fails with
    /// [`StoreError::UnknownUser`].
    fn commit(
        &self,
        event_id: EventId,
        expected_version: i64,
        write: RegistrationWrite,
    ) -> StoreFuture<'_, Registration>;

    /// Registrations joined with user and event, newest first.
    fn list_registrations(
        &self,
        event_id: Option<EventId>,
    ) -> StoreFuture<'_, Vec<RegistrationRecord>>;
}

/// Storage for user accounts.
pub trait UserStore: Send + Sync {
    /// Insert a user. Emails are unique.
    fn create_user(&self, user: User) -> StoreFuture<'_, User>;

    /// Look a user up by (normalized) email.
    fn find_user_by_email(&self, email: String) -> StoreFuture<'_, Option<User>>;

    /// Fetch a user by ID.
    fn get_user(&self, id: UserId) -> StoreFuture<'_, Option<User>>;
}
