//! In-memory store.
//!
//! All state sits behind one `tokio::sync::RwLock`, so every method is atomic
//! with respect to the others. Used by the test suites and as the backend when
//! no database is configured.

use super::{
    EventStore, RecordEvent, RecordUser, RegistrationRecord, RegistrationWrite, SeatLedger,
    StoreError, StoreFuture, UserStore,
};
use crate::types::{Event, EventDetails, EventId, Registration, RegistrationId, User, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug)]
struct StoredEvent {
    event: Event,
    version: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    events: HashMap<EventId, StoredEvent>,
    registrations: HashMap<RegistrationId, Registration>,
    by_pair: HashMap<(UserId, EventId), RegistrationId>,
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
}

impl MemoryState {
    fn count_confirmed(&self, event_id: EventId) -> u32 {
        let count = self
            .registrations
            .values()
            .filter(|r| r.event_id == event_id && r.is_confirmed())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn find(&self, user_id: UserId, event_id: EventId) -> Option<&Registration> {
        self.by_pair
            .get(&(user_id, event_id))
            .and_then(|id| self.registrations.get(id))
    }
}

/// Store keeping everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryStore {
    fn create_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            state.events.insert(event.id, StoredEvent { event: event.clone(), version: 0 });
            Ok(event)
        })
    }

    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state.events.get(&id).map(|stored| stored.event.clone()))
        })
    }

    fn list_events(&self) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut events: Vec<Event> =
                state.events.values().map(|stored| stored.event.clone()).collect();
            events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));
            Ok(events)
        })
    }

    fn update_event(
        &self,
        id: EventId,
        details: EventDetails,
        updated_at: DateTime<Utc>,
    ) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let confirmed = state.count_confirmed(id);
            let stored = state
                .events
                .get_mut(&id)
                .ok_or_else(|| StoreError::event_not_found(id))?;

            if details.capacity < confirmed {
                return Err(StoreError::CapacityBelowConfirmed { capacity: details.capacity, confirmed });
            }

            stored.event.apply(details, updated_at);
            stored.version += 1;
            Ok(stored.event.clone())
        })
    }

    fn delete_event(&self, id: EventId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            if !state.events.contains_key(&id) {
                return Err(StoreError::event_not_found(id));
            }

            let doomed: Vec<Registration> = state
                .registrations
                .values()
                .filter(|r| r.event_id == id)
                .cloned()
                .collect();
            for registration in &doomed {
                state.registrations.remove(&registration.id);
                state.by_pair.remove(&(registration.user_id, registration.event_id));
            }
            state.events.remove(&id);

            Ok(doomed.len() as u64)
        })
    }

    fn count_confirmed(&self, event_id: EventId) -> StoreFuture<'_, u32> {
        Box::pin(async move { Ok(self.state.read().await.count_confirmed(event_id)) })
    }

    fn get_registration(&self, id: RegistrationId) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move { Ok(self.state.read().await.registrations.get(&id).cloned()) })
    }

    fn find_registration(
        &self,
        user_id: UserId,
        event_id: EventId,
    ) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move { Ok(self.state.read().await.find(user_id, event_id).cloned()) })
    }

    fn load_ledger(&self, event_id: EventId, user_id: UserId) -> StoreFuture<'_, SeatLedger> {
        Box::pin(async move {
            let state = self.state.read().await;
            let stored = state
                .events
                .get(&event_id)
                .ok_or_else(|| StoreError::event_not_found(event_id))?;

            Ok(SeatLedger {
                event: stored.event.clone(),
                confirmed: state.count_confirmed(event_id),
                version: stored.version,
                registration: state.find(user_id, event_id).cloned(),
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
            let mut state = self.state.write().await;
            let version = state
                .events
                .get(&event_id)
                .map(|stored| stored.version)
                .ok_or_else(|| StoreError::event_not_found(event_id))?;

            if version != expected_version {
                return Err(StoreError::Conflict { event_id, expected: expected_version });
            }

            let registration = match write {
                RegistrationWrite::Insert(registration) => {
                    if !state.users.contains_key(&registration.user_id) {
                        return Err(StoreError::UnknownUser(registration.user_id));
                    }
                    let pair = (registration.user_id, registration.event_id);
                    if state.by_pair.contains_key(&pair) {
                        return Err(StoreError::Conflict { event_id, expected: expected_version });
                    }
                    state.by_pair.insert(pair, registration.id);
                    registration
                },
                RegistrationWrite::UpdateStatus(registration) => {
                    let existing = state.registrations.get(&registration.id).ok_or_else(|| {
                        StoreError::NotFound { entity: "Registration", id: registration.id.to_string() }
                    })?;
                    let mut updated = existing.clone();
                    updated.status = registration.status;
                    updated.updated_at = registration.updated_at;
                    updated
                },
            };

            state.registrations.insert(registration.id, registration.clone());
            if let Some(stored) = state.events.get_mut(&event_id) {
                stored.version += 1;
            }

            Ok(registration)
        })
    }

    fn list_registrations(
        &self,
        event_id: Option<EventId>,
    ) -> StoreFuture<'_, Vec<RegistrationRecord>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut records: Vec<RegistrationRecord> = state
                .registrations
                .values()
                .filter(|r| event_id.is_none_or(|id| r.event_id == id))
                .filter_map(|r| {
                    let user = state.users.get(&r.user_id)?;
                    let event = &state.events.get(&r.event_id)?.event;
                    Some(RegistrationRecord {
                        id: r.id,
                        status: r.status,
                        created_at: r.created_at,
                        updated_at: r.updated_at,
                        user: RecordUser { id: user.id, email: user.email.clone() },
                        event: RecordEvent {
                            id: event.id,
                            title: event.title.clone(),
                            date: event.date,
                            location: event.location.clone(),
                        },
                    })
                })
                .collect();
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(records)
        })
    }
}

impl UserStore for InMemoryStore {
    fn create_user(&self, user: User) -> StoreFuture<'_, User> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            if state.emails.contains_key(&user.email) {
                return Err(StoreError::DuplicateEmail(user.email));
            }
            state.emails.insert(user.email.clone(), user.id);
            state.users.insert(user.id, user.clone());
            Ok(user)
        })
    }

    fn find_user_by_email(&self, email: String) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let state = self.state.read().await;
            Ok(state.emails.get(&email).and_then(|id| state.users.get(id)).cloned())
        })
    }

    fn get_user(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move { Ok(self.state.read().await.users.get(&id).cloned()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RegistrationStatus;
    use chrono::Duration;

    fn details(title: &str, capacity: u32, days: i64) -> EventDetails {
        EventDetails {
            title: title.to_string(),
            description: "desc".to_string(),
            date: Utc::now() + Duration::days(days),
            capacity,
            location: "Hall".to_string(),
        }
    }

    async fn member(store: &InMemoryStore) -> UserId {
        let id = UserId::new();
        store
            .create_user(User {
                id,
                email: format!("{id}@example.com"),
                password_hash: "hash".to_string(),
                role: crate::types::Role::User,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        id
    }

    async fn seeded(capacity: u32) -> (InMemoryStore, Event) {
        let store = InMemoryStore::new();
        let event = store
            .create_event(Event::new(details("Launch", capacity, 1), Utc::now()))
            .await
            .unwrap();
        (store, event)
    }

    #[tokio::test]
    async fn list_events_orders_by_date() {
        let store = InMemoryStore::new();
        let later = store.create_event(Event::new(details("Later", 5, 10), Utc::now())).await.unwrap();
        let sooner = store.create_event(Event::new(details("Sooner", 5, 2), Utc::now())).await.unwrap();

        let listed: Vec<EventId> = store.list_events().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(listed, vec![sooner.id, later.id]);
    }

    #[tokio::test]
    async fn commit_rejects_stale_version() {
        let (store, event) = seeded(5).await;
        let user = member(&store).await;
        let ledger = store.load_ledger(event.id, user).await.unwrap();

        let first = Registration::confirmed(event.id, user, Utc::now());
        store.commit(event.id, ledger.version, RegistrationWrite::Insert(first)).await.unwrap();

        let second = Registration::confirmed(event.id, member(&store).await, Utc::now());
        let err = store
            .commit(event.id, ledger.version, RegistrationWrite::Insert(second))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.count_confirmed(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_status_keeps_row_identity() {
        let (store, event) = seeded(5).await;
        let user = member(&store).await;
        let registration = Registration::confirmed(event.id, user, Utc::now());
        store.commit(event.id, 0, RegistrationWrite::Insert(registration.clone())).await.unwrap();

        let cancelled = registration.clone().with_status(RegistrationStatus::Cancelled, Utc::now());
        let stored = store.commit(event.id, 1, RegistrationWrite::UpdateStatus(cancelled)).await.unwrap();

        assert_eq!(stored.id, registration.id);
        assert_eq!(stored.status, RegistrationStatus::Cancelled);
        assert_eq!(store.count_confirmed(event.id).await.unwrap(), 0);
        assert_eq!(store.load_ledger(event.id, user).await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn insert_for_unknown_user_takes_no_seat() {
        let (store, event) = seeded(1).await;
        let stranger = UserId::new();

        let err = store
            .commit(event.id, 0, RegistrationWrite::Insert(Registration::confirmed(event.id, stranger, Utc::now())))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownUser(stranger));

        let ledger = store.load_ledger(event.id, stranger).await.unwrap();
        assert_eq!((ledger.confirmed, ledger.version), (0, 0));
        assert!(ledger.registration.is_none());
    }

    #[tokio::test]
    async fn update_event_refuses_capacity_below_confirmed() {
        let (store, event) = seeded(2).await;
        for _ in 0..2 {
            let user = member(&store).await;
            let version = store.load_ledger(event.id, user).await.unwrap().version;
            let registration = Registration::confirmed(event.id, user, Utc::now());
            store.commit(event.id, version, RegistrationWrite::Insert(registration)).await.unwrap();
        }

        let err = store.update_event(event.id, details("Launch", 1, 1), Utc::now()).await.unwrap_err();
        assert_eq!(err, StoreError::CapacityBelowConfirmed { capacity: 1, confirmed: 2 });

        let updated = store.update_event(event.id, details("Launch", 3, 1), Utc::now()).await.unwrap();
        assert_eq!(updated.capacity, 3);
    }

    #[tokio::test]
    async fn delete_event_removes_registrations_first() {
        let (store, event) = seeded(5).await;
        let registration = Registration::confirmed(event.id, member(&store).await, Utc::now());
        store.commit(event.id, 0, RegistrationWrite::Insert(registration.clone())).await.unwrap();

        assert_eq!(store.delete_event(event.id).await.unwrap(), 1);
        assert!(store.get_registration(registration.id).await.unwrap().is_none());
        assert!(store.get_event(event.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_event(event.id).await.unwrap_err(),
            StoreError::NotFound { entity: "Event", .. }
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        let user = User {
            id: UserId::new(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: crate::types::Role::User,
            created_at: Utc::now(),
        };
        store.create_user(user.clone()).await.unwrap();

        let twin = User { id: UserId::new(), ..user };
        assert_eq!(
            store.create_user(twin).await.unwrap_err(),
            StoreError::DuplicateEmail("ada@example.com".to_string())
        );
    }
}
