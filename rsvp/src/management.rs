//! Event Management.
//!
//! Administrator CRUD on events. Deleting an event removes its registrations
//! before the event itself, in one store transaction.

use crate::store::{EventStore, StoreError};
use crate::types::{Event, EventDetails, EventId};
use rsvp_core::environment::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Errors from event management.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagementError {
    /// Input rejected.
    #[error("{0}")]
    Validation(String),

    /// The event does not exist.
    #[error("Event with id {0} not found")]
    NotFound(EventId),

    /// Store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl ManagementError {
    fn from_store(id: EventId, err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(id),
            StoreError::CapacityBelowConfirmed { capacity, confirmed } => Self::Validation(format!(
                "capacity {capacity} is below the {confirmed} confirmed registrations"
            )),
            other => Self::Store(other),
        }
    }
}

/// Creates, edits and deletes events.
#[derive(Clone)]
pub struct EventManager {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
}

impl EventManager {
    /// Create a manager over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create an event.
    ///
    /// # Errors
    ///
    /// [`ManagementError::Validation`] when a field is missing or capacity is 0.
    pub async fn create(&self, details: EventDetails) -> Result<Event, ManagementError> {
        let details = details.validate().map_err(ManagementError::Validation)?;
        let event = Event::new(details, self.clock.now());

        let event = self.store.create_event(event).await.map_err(ManagementError::Store)?;
        tracing::info!(event_id = %event.id, capacity = event.capacity, "Event created");
        Ok(event)
    }

    /// Replace an event's fields.
    ///
    /// # Errors
    ///
    /// - [`ManagementError::Validation`] for invalid input, or a capacity
    ///   below the confirmed count
    /// - [`ManagementError::NotFound`] if the event does not exist
    pub async fn update(&self, id: EventId, details: EventDetails) -> Result<Event, ManagementError> {
        let details = details.validate().map_err(ManagementError::Validation)?;

        let event = self
            .store
            .update_event(id, details, self.clock.now())
            .await
            .map_err(|e| ManagementError::from_store(id, e))?;

        tracing::info!(event_id = %id, capacity = event.capacity, "Event updated");
        Ok(event)
    }

    /// Delete an event and, first, its registrations.
    ///
    /// # Errors
    ///
    /// [`ManagementError::NotFound`] if the event does not exist.
    pub async fn delete(&self, id: EventId) -> Result<(), ManagementError> {
        let removed = self
            .store
            .delete_event(id)
            .await
            .map_err(|e| ManagementError::from_store(id, e))?;

        tracing::info!(event_id = %id, registrations_removed = removed, "Event deleted");
        Ok(())
    }

    /// Fetch one event.
    ///
    /// # Errors
    ///
    /// [`ManagementError::NotFound`] if the event does not exist.
    pub async fn get(&self, id: EventId) -> Result<Event, ManagementError> {
        self.store
            .get_event(id)
            .await
            .map_err(ManagementError::Store)?
            .ok_or(ManagementError::NotFound(id))
    }

    /// All events by date.
    ///
    /// # Errors
    ///
    /// [`ManagementError::Store`] on store failure.
    pub async fn list(&self) -> Result<Vec<Event>, ManagementError> {
        self.store.list_events().await.map_err(ManagementError::Store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, RegistrationWrite, UserStore};
    use crate::types::{Registration, Role, User, UserId};
    use rsvp_testing::test_clock;

    fn details(capacity: u32) -> EventDetails {
        EventDetails {
            title: "Workshop".to_string(),
            description: "Hands-on".to_string(),
            date: test_clock().now(),
            capacity,
            location: "Online".to_string(),
        }
    }

    fn manager() -> (EventManager, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (EventManager::new(store.clone(), Arc::new(test_clock())), store)
    }

    #[tokio::test]
    async fn create_validates_details() {
        let (manager, _) = manager();

        let err = manager.create(details(0)).await.unwrap_err();
        assert_eq!(err, ManagementError::Validation("capacity must be a positive integer".to_string()));

        let event = manager.create(details(3)).await.unwrap();
        assert_eq!(manager.get(event.id).await.unwrap(), event);
    }

    #[tokio::test]
    async fn update_refuses_capacity_below_confirmed() {
        let (manager, store) = manager();
        let event = manager.create(details(3)).await.unwrap();
        for n in 0..2 {
            let user = store
                .create_user(User {
                    id: UserId::new(),
                    email: format!("guest{n}@example.com"),
                    password_hash: "hash".to_string(),
                    role: Role::User,
                    created_at: test_clock().now(),
                })
                .await
                .unwrap();
            let version = store.load_ledger(event.id, user.id).await.unwrap().version;
            store
                .commit(
                    event.id,
                    version,
                    RegistrationWrite::Insert(Registration::confirmed(event.id, user.id, test_clock().now())),
                )
                .await
                .unwrap();
        }

        let err = manager.update(event.id, details(1)).await.unwrap_err();
        assert!(matches!(err, ManagementError::Validation(_)));

        let updated = manager.update(event.id, details(2)).await.unwrap();
        assert_eq!(updated.capacity, 2);
    }

    #[tokio::test]
    async fn missing_events_are_not_found() {
        let (manager, _) = manager();
        let id = EventId::new();

        assert_eq!(manager.delete(id).await.unwrap_err(), ManagementError::NotFound(id));
        assert_eq!(manager.update(id, details(1)).await.unwrap_err(), ManagementError::NotFound(id));
        assert_eq!(manager.get(id).await.unwrap_err(), ManagementError::NotFound(id));
    }
}
