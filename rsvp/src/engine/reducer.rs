//! Registration reducer.
//!
//! Decides whether a register or cancel command is accepted, given a
//! [`SeatLedger`] read at one registration version. The reducer performs no
//! I/O: loading the ledger and committing the write are returned as effects
//! and their results come back as actions.
//!
//! # Flow
//!
//! ```text
//! Register ─(no ledger)─> load ledger ─> LedgerLoaded ─> Register (again)
//!          ─(ledger)────> decide ─┬─> Rejected
//!                                 └─> commit ─┬─> Committed
//!                                             ├─> WriteConflicted
//!                                             └─> WriteFailed
//! ```

use super::{RegistrationError, RegistrationOutcome};
use crate::store::{EventStore, RegistrationWrite, SeatLedger, StoreError};
use crate::types::{EventId, Registration, RegistrationStatus, UserId};
use rsvp_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use std::sync::Arc;

// ============================================================================
// State & Actions
// ============================================================================

/// State of one registration attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationState {
    /// Ledger the decision is based on, once loaded
    pub ledger: Option<SeatLedger>,
    /// A ledger load is in flight
    pub loading: bool,
    /// Result of the attempt, once decided
    pub outcome: Option<Result<RegistrationOutcome, RegistrationError>>,
}

impl RegistrationState {
    /// Fresh state for a new attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the decided outcome, if any.
    pub fn take_outcome(&mut self) -> Option<Result<RegistrationOutcome, RegistrationError>> {
        self.outcome.take()
    }
}

/// Commands and the events that answer them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationAction {
    // Commands
    /// Take a seat at an event
    Register {
        /// Event
        event_id: EventId,
        /// User
        user_id: UserId,
    },
    /// Give a seat back
    Cancel {
        /// Event
        event_id: EventId,
        /// User
        user_id: UserId,
    },

    // Events
    /// The ledger was read
    LedgerLoaded {
        /// Ledger snapshot
        ledger: SeatLedger,
    },
    /// Reading the ledger failed
    LoadFailed {
        /// Event that was looked up
        event_id: EventId,
        /// Store error
        error: StoreError,
    },
    /// The write was applied
    Committed {
        /// Registration as stored
        registration: Registration,
        /// A new row was inserted
        created: bool,
    },
    /// The command was refused
    Rejected {
        /// Why
        error: RegistrationError,
    },
    /// The registration version moved before the write landed
    WriteConflicted {
        /// Version the write expected
        expected: i64,
    },
    /// The write failed for another reason
    WriteFailed {
        /// Store error message
        error: String,
    },
}

impl RegistrationAction {
    const fn target(&self) -> Option<(EventId, UserId)> {
        match self {
            Self::Register { event_id, user_id } | Self::Cancel { event_id, user_id } => {
                Some((*event_id, *user_id))
            },
            _ => None,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the registration reducer.
#[derive(Clone)]
pub struct RegistrationEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Event store
    pub store: Arc<dyn EventStore>,
}

impl RegistrationEnvironment {
    /// Creates a new `RegistrationEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn EventStore>) -> Self {
        Self { clock, store }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer enforcing capacity and one-row-per-pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistrationReducer;

/// What an accepted command writes.
#[derive(Debug)]
enum Decision {
    Write { write: RegistrationWrite, created: bool },
    Unchanged(Registration),
}

impl RegistrationReducer {
    /// Creates a new `RegistrationReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Register decision, in order: capacity, then the existing row.
    fn decide_register(
        ledger: &SeatLedger,
        user_id: UserId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Decision, RegistrationError> {
        let event_id = ledger.event.id;

        if ledger.is_full() {
            return Err(RegistrationError::CapacityExceeded {
                event_id,
                capacity: ledger.event.capacity,
            });
        }

        match &ledger.registration {
            Some(existing) if existing.is_confirmed() => {
                Err(RegistrationError::AlreadyRegistered { event_id, user_id })
            },
            Some(existing) => Ok(Decision::Write {
                write: RegistrationWrite::UpdateStatus(
                    existing.clone().with_status(RegistrationStatus::Confirmed, now),
                ),
                created: false,
            }),
            None => Ok(Decision::Write {
                write: RegistrationWrite::Insert(Registration::confirmed(event_id, user_id, now)),
                created: true,
            }),
        }
    }

    /// Cancel decision. A row that is already cancelled is returned as is.
    fn decide_cancel(
        ledger: &SeatLedger,
        user_id: UserId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Decision, RegistrationError> {
        let event_id = ledger.event.id;

        match &ledger.registration {
            None => Err(RegistrationError::RegistrationNotFound { event_id, user_id }),
            Some(existing) if !existing.is_confirmed() => Ok(Decision::Unchanged(existing.clone())),
            Some(existing) => Ok(Decision::Write {
                write: RegistrationWrite::UpdateStatus(
                    existing.clone().with_status(RegistrationStatus::Cancelled, now),
                ),
                created: false,
            }),
        }
    }

    /// Effect reading the ledger, followed by a re-dispatch of `command`.
    fn load_then_retry(
        command: RegistrationAction,
        event_id: EventId,
        user_id: UserId,
        env: &RegistrationEnvironment,
    ) -> Effect<RegistrationAction> {
        let store = Arc::clone(&env.store);

        Effect::Sequential(vec![
            Effect::future(async move {
                Some(match store.load_ledger(event_id, user_id).await {
                    Ok(ledger) => RegistrationAction::LedgerLoaded { ledger },
                    Err(error) => RegistrationAction::LoadFailed { event_id, error },
                })
            }),
            Effect::future(async move { Some(command) }),
        ])
    }

    /// Effect committing `write` at the ledger's version.
    fn commit(
        ledger: &SeatLedger,
        write: RegistrationWrite,
        created: bool,
        env: &RegistrationEnvironment,
    ) -> Effect<RegistrationAction> {
        let store = Arc::clone(&env.store);
        let event_id = ledger.event.id;
        let expected = ledger.version;

        Effect::future(async move {
            Some(match store.commit(event_id, expected, write).await {
                Ok(registration) => RegistrationAction::Committed { registration, created },
                Err(StoreError::Conflict { expected, .. }) => {
                    RegistrationAction::WriteConflicted { expected }
                },
                // Rows only disappear together with their event.
                Err(StoreError::NotFound { .. }) => RegistrationAction::Rejected {
                    error: RegistrationError::EventNotFound(event_id),
                },
                Err(StoreError::UnknownUser(user_id)) => RegistrationAction::Rejected {
                    error: RegistrationError::UnknownUser(user_id),
                },
                Err(error) => RegistrationAction::WriteFailed { error: error.to_string() },
            })
        })
    }

    /// Apply an event to state.
    fn apply_event(state: &mut RegistrationState, action: &RegistrationAction) {
        match action {
            RegistrationAction::LedgerLoaded { ledger } => {
                state.ledger = Some(ledger.clone());
                state.loading = false;
            },
            RegistrationAction::LoadFailed { event_id, error } => {
                state.loading = false;
                state.outcome = Some(Err(match error {
                    StoreError::NotFound { .. } => RegistrationError::EventNotFound(*event_id),
                    other => RegistrationError::Storage(other.to_string()),
                }));
            },
            RegistrationAction::Committed { registration, created } => {
                if let Some(ledger) = state.ledger.as_mut() {
                    let was_confirmed =
                        ledger.registration.as_ref().is_some_and(Registration::is_confirmed);
                    match (was_confirmed, registration.is_confirmed()) {
                        (false, true) => ledger.confirmed += 1,
                        (true, false) => ledger.confirmed = ledger.confirmed.saturating_sub(1),
                        _ => {},
                    }
                    ledger.version += 1;
                    ledger.registration = Some(registration.clone());
                }
                state.outcome = Some(Ok(RegistrationOutcome {
                    registration: registration.clone(),
                    created: *created,
                }));
            },
            RegistrationAction::Rejected { error } => {
                state.outcome = Some(Err(error.clone()));
            },
            RegistrationAction::WriteConflicted { .. } => {
                state.outcome = Some(Err(RegistrationError::Conflict));
            },
            RegistrationAction::WriteFailed { error } => {
                state.outcome = Some(Err(RegistrationError::Storage(error.clone())));
            },
            RegistrationAction::Register { .. } | RegistrationAction::Cancel { .. } => {},
        }
    }
}

impl Reducer for RegistrationReducer {
    type State = RegistrationState;
    type Action = RegistrationAction;
    type Environment = RegistrationEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some((event_id, user_id)) = action.target() else {
            // ========== Events ==========
            Self::apply_event(state, &action);
            return SmallVec::new();
        };

        // ========== Commands ==========

        // Already decided (e.g. the ledger load failed).
        if state.outcome.is_some() {
            return SmallVec::new();
        }

        let Some(ledger) = state.ledger.as_ref() else {
            if state.loading {
                Self::apply_event(state, &RegistrationAction::Rejected {
                    error: RegistrationError::Internal("ledger load produced no result".to_string()),
                });
                return SmallVec::new();
            }

            tracing::trace!(%event_id, %user_id, "Ledger not loaded, loading");
            state.loading = true;
            return smallvec![Self::load_then_retry(action, event_id, user_id, env)];
        };

        let now = env.clock.now();
        let decision = match action {
            RegistrationAction::Register { .. } => Self::decide_register(ledger, user_id, now),
            _ => Self::decide_cancel(ledger, user_id, now),
        };

        match decision {
            Err(error) => {
                tracing::debug!(%event_id, %user_id, %error, "Registration command rejected");
                Self::apply_event(state, &RegistrationAction::Rejected { error });
                SmallVec::new()
            },
            Ok(Decision::Unchanged(registration)) => {
                state.outcome = Some(Ok(RegistrationOutcome { registration, created: false }));
                SmallVec::new()
            },
            Ok(Decision::Write { write, created }) => {
                smallvec![Self::commit(ledger, write, created, env)]
            },
        }
    }
}
