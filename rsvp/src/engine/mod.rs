//! Registration Engine.
//!
//! The decision logic lives in [`RegistrationReducer`]; this module is the
//! shell that runs it. Each command:
//!
//! 1. Takes the in-process lock for its event ([`EventLocks`])
//! 2. Runs the reducer to completion against a fresh ledger
//! 3. Retries with backoff when the conditional commit lost a race against
//!    another writer (another process, or an event update)
//!
//! The lock keeps same-process registrations from racing each other; the
//! versioned commit keeps every process honest. The confirmed count of an
//! event therefore never exceeds its capacity.

use crate::store::EventStore;
use crate::types::{EventId, Registration, UserId};
use rsvp_core::environment::Clock;
use rsvp_runtime::retry::{retry_with_predicate, RetryError, RetryPolicy};
use std::sync::Arc;
use thiserror::Error;

pub mod locks;
pub mod reducer;

pub use locks::{EventLockGuard, EventLocks};
pub use reducer::{
    RegistrationAction, RegistrationEnvironment, RegistrationReducer, RegistrationState,
};

/// Why a registration command failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The event does not exist.
    #[error("Event with id {0} not found")]
    EventNotFound(EventId),

    /// The user has no registration for the event.
    #[error("Registration for event {event_id} not found")]
    RegistrationNotFound {
        /// Event
        event_id: EventId,
        /// User
        user_id: UserId,
    },

    /// Every seat is taken.
    #[error("Event is at full capacity")]
    CapacityExceeded {
        /// Event
        event_id: EventId,
        /// Its capacity
        capacity: u32,
    },

    /// The user already holds a confirmed registration.
    #[error("Already registered for this event")]
    AlreadyRegistered {
        /// Event
        event_id: EventId,
        /// User
        user_id: UserId,
    },

    /// The user holds a valid credential but has no account.
    #[error("No account for user {0}")]
    UnknownUser(UserId),

    /// The commit lost a race. Retried internally.
    #[error("registration version changed before commit")]
    Conflict,

    /// Every attempt lost a race.
    #[error("registration did not settle after {attempts} attempts")]
    Transient {
        /// Attempts made
        attempts: u32,
    },

    /// The store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// The engine itself misbehaved.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistrationError {
    /// `true` for errors worth another attempt.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EventNotFound(_) | Self::RegistrationNotFound { .. } => "not_found",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::UnknownUser(_) => "unknown_user",
            Self::Conflict | Self::Transient { .. } => "transient",
            Self::Storage(_) | Self::Internal(_) => "error",
        }
    }
}

/// Result of an accepted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    /// The registration as stored
    pub registration: Registration,
    /// `true` when a new row was inserted, `false` when an existing row was
    /// reused
    pub created: bool,
}

/// Runs registration commands with capacity guarantees.
pub struct RegistrationEngine {
    reducer: RegistrationReducer,
    env: RegistrationEnvironment,
    locks: EventLocks,
    policy: RetryPolicy,
}

impl RegistrationEngine {
    /// Create an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>, policy: RetryPolicy) -> Self {
        Self {
            reducer: RegistrationReducer::new(),
            env: RegistrationEnvironment::new(clock, store),
            locks: EventLocks::new(),
            policy,
        }
    }

    /// Register `user_id` for `event_id`.
    ///
    /// Inserts a new confirmed row, or reactivates the user's cancelled row.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EventNotFound`] if the event does not exist
    /// - [`RegistrationError::CapacityExceeded`] if every seat is taken
    /// - [`RegistrationError::AlreadyRegistered`] if the user holds a seat
    /// - [`RegistrationError::UnknownUser`] if the user has no account
    /// - [`RegistrationError::Transient`] if every attempt lost a race
    #[tracing::instrument(skip_all, fields(%event_id, %user_id))]
    pub async fn register(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        self.execute("register", event_id, RegistrationAction::Register { event_id, user_id })
            .await
    }

    /// Cancel `user_id`'s registration for `event_id`.
    ///
    /// Cancelling an already cancelled registration returns it unchanged.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EventNotFound`] if the event does not exist
    /// - [`RegistrationError::RegistrationNotFound`] if the user never registered
    /// - [`RegistrationError::Transient`] if every attempt lost a race
    #[tracing::instrument(skip_all, fields(%event_id, %user_id))]
    pub async fn cancel(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Registration, RegistrationError> {
        self.execute("cancel", event_id, RegistrationAction::Cancel { event_id, user_id })
            .await
            .map(|outcome| outcome.registration)
    }

    /// Seats still free: `max(0, capacity - confirmed)`.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::EventNotFound`] if the event does not exist.
    pub async fn available_seats(&self, event_id: EventId) -> Result<u32, RegistrationError> {
        let event = self
            .env
            .store
            .get_event(event_id)
            .await
            .map_err(|e| RegistrationError::Storage(e.to_string()))?
            .ok_or(RegistrationError::EventNotFound(event_id))?;

        let confirmed = self
            .env
            .store
            .count_confirmed(event_id)
            .await
            .map_err(|e| RegistrationError::Storage(e.to_string()))?;

        Ok(event.capacity.saturating_sub(confirmed))
    }

    async fn execute(
        &self,
        operation: &'static str,
        event_id: EventId,
        command: RegistrationAction,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let _guard = self.locks.acquire(event_id).await;

        let result = retry_with_predicate(
            &self.policy,
            || self.attempt(command.clone()),
            RegistrationError::is_conflict,
        )
        .await
        .map_err(|err| match err {
            RetryError::Exhausted { attempts, .. } => RegistrationError::Transient { attempts },
            RetryError::Permanent(err) => err,
        });

        match &result {
            Ok(outcome) => {
                tracing::info!(
                    operation,
                    registration_id = %outcome.registration.id,
                    status = %outcome.registration.status,
                    created = outcome.created,
                    "Registration command applied"
                );
                metrics::counter!("rsvp_registrations_total", "operation" => operation, "outcome" => "ok")
                    .increment(1);
            },
            Err(err @ (RegistrationError::Storage(_) | RegistrationError::Internal(_))) => {
                tracing::error!(operation, error = %err, "Registration command failed");
                metrics::counter!("rsvp_registrations_total", "operation" => operation, "outcome" => err.kind())
                    .increment(1);
            },
            Err(err) => {
                tracing::info!(operation, error = %err, "Registration command refused");
                metrics::counter!("rsvp_registrations_total", "operation" => operation, "outcome" => err.kind())
                    .increment(1);
            },
        }

        result
    }

    /// One run of the reducer against a freshly loaded ledger.
    async fn attempt(
        &self,
        command: RegistrationAction,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let mut state = RegistrationState::new();

        rsvp_runtime::drive(&self.reducer, &mut state, command, &self.env)
            .await
            .map_err(|e| RegistrationError::Internal(e.to_string()))?;

        let outcome = state
            .take_outcome()
            .unwrap_or_else(|| Err(RegistrationError::Internal("no outcome decided".to_string())));

        if matches!(outcome, Err(RegistrationError::Conflict)) {
            metrics::counter!("rsvp_registration_conflicts_total").increment(1);
        }

        outcome
    }
}

impl std::fmt::Debug for RegistrationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationEngine")
            .field("policy", &self.policy)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}
