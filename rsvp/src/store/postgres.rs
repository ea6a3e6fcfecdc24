//! PostgreSQL store.
//!
//! Registration writes run in a transaction that first bumps the event's
//! `registration_version` with a conditional `UPDATE`. If no row matches,
//! another writer got there first and the commit fails with
//! [`StoreError::Conflict`]. Together with the composite
//! `UNIQUE (user_id, event_id)` constraint this keeps the confirmed count
//! within capacity even when several application instances share the
//! database.
//!
//! # Example
//!
//! ```no_run
//! use rsvp::store::PostgresStore;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::connect("postgres://localhost/rsvp", 10, Duration::from_secs(5)).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use super::{
    EventStore, RecordEvent, RecordUser, RegistrationRecord, RegistrationWrite, SeatLedger,
    StoreError, StoreFuture, UserStore,
};
use crate::types::{
    Event, EventDetails, EventId, Registration, RegistrationId, User, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

const EVENT_COLUMNS: &str =
    "id, title, description, date, capacity, location, created_at, updated_at";

const REGISTRATION_COLUMNS: &str = "id, event_id, user_id, status, created_at, updated_at";

/// Store backed by a PostgreSQL connection pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await
            .map_err(db)?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    async fn lock_event(
        tx: &mut Transaction<'_, Postgres>,
        id: EventId,
    ) -> Result<Event, StoreError> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(db)?;

        row.ok_or_else(|| StoreError::event_not_found(id))?.try_into()
    }

    async fn count_confirmed_in(
        tx: &mut Transaction<'_, Postgres>,
        event_id: EventId,
    ) -> Result<u32, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'CONFIRMED'",
        )
        .bind(*event_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(db)?;

        Ok(to_count(count))
    }
}

fn db(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|e| e.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|e| e.is_foreign_key_violation())
}

fn to_count(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

fn to_capacity(capacity: u32) -> i32 {
    i32::try_from(capacity).unwrap_or(i32::MAX)
}

// ============================================================================
// Row mapping
// ============================================================================

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    description: String,
    date: DateTime<Utc>,
    capacity: i32,
    location: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let capacity = u32::try_from(row.capacity)
            .map_err(|_| StoreError::Database(format!("invalid capacity {}", row.capacity)))?;

        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            date: row.date,
            capacity,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = StoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RegistrationId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            user_id: UserId::from_uuid(row.user_id),
            status: row.status.parse().map_err(|e| StoreError::Database(format!("{e}")))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(|e| StoreError::Database(format!("{e}")))?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct RecordRow {
    id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: Uuid,
    user_email: String,
    event_id: Uuid,
    event_title: String,
    event_date: DateTime<Utc>,
    event_location: String,
}

impl TryFrom<RecordRow> for RegistrationRecord {
    type Error = StoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RegistrationId::from_uuid(row.id),
            status: row.status.parse().map_err(|e| StoreError::Database(format!("{e}")))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: RecordUser { id: UserId::from_uuid(row.user_id), email: row.user_email },
            event: RecordEvent {
                id: EventId::from_uuid(row.event_id),
                title: row.event_title,
                date: row.event_date,
                location: row.event_location,
            },
        })
    }
}

#[derive(FromRow)]
struct LedgerRow {
    #[sqlx(flatten)]
    event: EventRow,
    confirmed: i64,
    registration_version: i64,
}

// ============================================================================
// EventStore
// ============================================================================

impl EventStore for PostgresStore {
    fn create_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO events (id, title, description, date, capacity, location, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(*event.id.as_uuid())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.date)
            .bind(to_capacity(event.capacity))
            .bind(&event.location)
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(&self.pool)
            .await
            .map_err(db)?;

            tracing::debug!(event_id = %event.id, "Event inserted");
            Ok(event)
        })
    }

    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let row: Option<EventRow> =
                sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                    .bind(*id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db)?;

            row.map(Event::try_from).transpose()
        })
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let rows: Vec<EventRow> = sqlx::query_as(&format!(
                "SELECT {EVENT_COLUMNS} FROM events ORDER BY date ASC, created_at ASC"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

            rows.into_iter().map(Event::try_from).collect()
        })
    }

    fn update_event(
        &self,
        id: EventId,
        details: EventDetails,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db)?;

            Self::lock_event(&mut tx, id).await?;
            let confirmed = Self::count_confirmed_in(&mut tx, id).await?;
            if details.capacity < confirmed {
                return Err(StoreError::CapacityBelowConfirmed {
                    capacity: details.capacity,
                    confirmed,
                });
            }

            let row: EventRow = sqlx::query_as(&format!(
                r"
                UPDATE events
                SET title = $2, description = $3, date = $4, capacity = $5, location = $6,
                    updated_at = $7, registration_version = registration_version + 1
                WHERE id = $1
                RETURNING {EVENT_COLUMNS}
                "
            ))
            .bind(*id.as_uuid())
            .bind(&details.title)
            .bind(&details.description)
            .bind(details.date)
            .bind(to_capacity(details.capacity))
            .bind(&details.location)
            .bind(updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(db)?;

            tx.commit().await.map_err(db)?;
            row.try_into()
        })
    }

    fn delete_event(&self, id: EventId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db)?;

            Self::lock_event(&mut tx, id).await?;

            let removed = sqlx::query("DELETE FROM registrations WHERE event_id = $1")
                .bind(*id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db)?
                .rows_affected();

            sqlx::query("DELETE FROM events WHERE id = $1")
                .bind(*id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db)?;

            tx.commit().await.map_err(db)?;
            Ok(removed)
        })
    }

    fn count_confirmed(&self, event_id: EventId) -> StoreFuture<'_, u32> {
        Box::pin(async move {
            let (count,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'CONFIRMED'",
            )
            .bind(*event_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;

            Ok(to_count(count))
        })
    }

    fn get_registration(&self, id: RegistrationId) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move {
            let row: Option<RegistrationRow> = sqlx::query_as(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1"
            ))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

            row.map(Registration::try_from).transpose()
        })
    }

    fn find_registration(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move {
            let row: Option<RegistrationRow> = sqlx::query_as(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE user_id = $1 AND event_id = $2"
            ))
            .bind(*user_id.as_uuid())
            .bind(*event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

            row.map(Registration::try_from).transpose()
        })
    }

    fn load_ledger(&self, event_id: EventId, user_id: UserId) -> StoreFuture<'_, SeatLedger> {
        Box::pin(async move {
            // One statement so the count and the version come from the same snapshot.
            let row: Option<LedgerRow> = sqlx::query_as(&format!(
                r"
                SELECT {EVENT_COLUMNS}, registration_version,
                    (SELECT COUNT(*) FROM registrations r
                     WHERE r.event_id = events.id AND r.status = 'CONFIRMED') AS confirmed
                FROM events
                WHERE id = $1
                "
            ))
            .bind(*event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

            let row = row.ok_or_else(|| StoreError::event_not_found(event_id))?;
            let registration = self.find_registration(user_id, event_id).await?;

            Ok(SeatLedger {
                confirmed: to_count(row.confirmed),
                version: row.registration_version,
                event: row.event.try_into()?,
                registration,
            })
        })
    }

    fn commit(
        &self,
        event_id: EventId,
        expected_version: i64,
        write: RegistrationWrite,
    ) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db)?;

            let bumped = sqlx::query(
                r"
                UPDATE events
                SET registration_version = registration_version + 1
                WHERE id = $1 AND registration_version = $2
                ",
            )
            .bind(*event_id.as_uuid())
            .bind(expected_version)
            .execute(&mut *tx)
            .await
            .map_err(db)?
            .rows_affected();

            if bumped == 0 {
                let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1")
                    .bind(*event_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db)?;

                return Err(match exists {
                    Some(_) => StoreError::Conflict { event_id, expected: expected_version },
                    None => StoreError::event_not_found(event_id),
                });
            }

            let row: Option<RegistrationRow> = match &write {
                RegistrationWrite::Insert(registration) => sqlx::query_as(&format!(
                    r"
                    INSERT INTO registrations (id, event_id, user_id, status, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING {REGISTRATION_COLUMNS}
                    "
                ))
                .bind(*registration.id.as_uuid())
                .bind(*registration.event_id.as_uuid())
                .bind(*registration.user_id.as_uuid())
                .bind(registration.status.as_str())
                .bind(registration.created_at)
                .bind(registration.updated_at)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::Conflict { event_id, expected: expected_version }
                    } else if is_foreign_key_violation(&e) {
                        StoreError::UnknownUser(registration.user_id)
                    } else {
                        db(e)
                    }
                })?,
                RegistrationWrite::UpdateStatus(registration) => sqlx::query_as(&format!(
                    r"
                    UPDATE registrations
                    SET status = $2, updated_at = $3
                    WHERE id = $1
                    RETURNING {REGISTRATION_COLUMNS}
                    "
                ))
                .bind(*registration.id.as_uuid())
                .bind(registration.status.as_str())
                .bind(registration.updated_at)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db)?,
            };

            let row = row.ok_or_else(|| StoreError::NotFound {
                entity: "Registration",
                id: write.registration().id.to_string(),
            })?;

            tx.commit().await.map_err(db)?;
            row.try_into()
        })
    }

    fn list_registrations(
        &self,
        event_id: Option<EventId>,
    ) -> StoreFuture<'_, Vec<RegistrationRecord>> {
        Box::pin(async move {
            let rows: Vec<RecordRow> = sqlx::query_as(
                r"
                SELECT r.id, r.status, r.created_at, r.updated_at,
                       u.id AS user_id, u.email AS user_email,
                       e.id AS event_id, e.title AS event_title,
                       e.date AS event_date, e.location AS event_location
                FROM registrations r
                JOIN users u ON u.id = r.user_id
                JOIN events e ON e.id = r.event_id
                WHERE ($1::uuid IS NULL OR r.event_id = $1)
                ORDER BY r.created_at DESC
                ",
            )
            .bind(event_id.map(|id| *id.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

            rows.into_iter().map(RegistrationRecord::try_from).collect()
        })
    }
}

// ============================================================================
// UserStore
// ============================================================================

impl UserStore for PostgresStore {
    fn create_user(&self, user: User) -> StoreFuture<'_, User> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO users (id, email, password_hash, role, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(*user.id.as_uuid())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateEmail(user.email.clone())
                } else {
                    db(e)
                }
            })?;

            Ok(user)
        })
    }

    fn find_user_by_email(&self, email: String) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let row: Option<UserRow> = sqlx::query_as(
                "SELECT id, email, password_hash, role, created_at FROM users WHERE email = $1",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

            row.map(User::try_from).transpose()
        })
    }

    fn get_user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let row: Option<UserRow> = sqlx::query_as(
                "SELECT id, email, password_hash, role, created_at FROM users WHERE id = $1",
            )
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

            row.map(User::try_from).transpose()
        })
    }
}
