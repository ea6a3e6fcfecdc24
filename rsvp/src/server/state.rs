//! Application state for the HTTP server.
//!
//! Every service is built once at startup from the same store and clock and
//! shared by all handlers. Cloning is cheap.

use crate::auth::{AccountService, IdentityProvider};
use crate::capacity::CapacityReporter;
use crate::engine::RegistrationEngine;
use crate::management::EventManager;
use crate::reporting::RegistrationReports;
use crate::store::{EventStore, UserStore};
use rsvp_core::environment::Clock;
use rsvp_runtime::retry::RetryPolicy;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Register and cancel
    pub engine: Arc<RegistrationEngine>,
    /// Seat availability
    pub capacity: CapacityReporter,
    /// Event CRUD
    pub events: EventManager,
    /// Admin registration reports
    pub reports: RegistrationReports,
    /// Sign-up and log-in
    pub accounts: AccountService,
    /// Credential verification
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Build every service over one store.
    #[must_use]
    pub fn new<S>(
        store: Arc<S>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self
    where
        S: EventStore + UserStore + 'static,
    {
        let events: Arc<dyn EventStore> = store.clone();
        let users: Arc<dyn UserStore> = store;

        Self {
            engine: Arc::new(RegistrationEngine::new(events.clone(), clock.clone(), retry)),
            capacity: CapacityReporter::new(events.clone()),
            events: EventManager::new(events.clone(), clock.clone()),
            reports: RegistrationReports::new(events),
            accounts: AccountService::new(users, identity.clone(), clock),
            identity,
        }
    }
}
