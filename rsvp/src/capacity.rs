//! Capacity Reporter.
//!
//! A derived read. Every report counts confirmed registrations again, so
//! availability is never served from a stale cache.

use crate::store::{EventStore, StoreError};
use crate::types::{Event, EventId};
use serde::Serialize;
use std::sync::Arc;

/// Seats of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityReport {
    /// Maximum confirmed registrations
    pub capacity: u32,
    /// Confirmed registrations
    pub confirmed: u32,
    /// `max(0, capacity - confirmed)`
    pub available: u32,
}

impl CapacityReport {
    /// Derive availability from a capacity and a confirmed count.
    #[must_use]
    pub const fn compute(capacity: u32, confirmed: u32) -> Self {
        Self {
            capacity,
            confirmed,
            available: capacity.saturating_sub(confirmed),
        }
    }

    /// `true` when no seat is left.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.available == 0
    }
}

/// An event and the seat counts derived from that same read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCapacity {
    /// The event as read
    pub event: Event,
    /// Seats, computed from `event.capacity`
    pub report: CapacityReport,
}

/// Reads capacity reports from the store.
#[derive(Clone)]
pub struct CapacityReporter {
    store: Arc<dyn EventStore>,
}

impl CapacityReporter {
    /// Create a reporter over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Current report for an event, together with the event it was
    /// computed from.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the event does not exist.
    pub async fn report(&self, event_id: EventId) -> Result<EventCapacity, StoreError> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| StoreError::event_not_found(event_id))?;
        let confirmed = self.store.count_confirmed(event_id).await?;

        Ok(EventCapacity { report: CapacityReport::compute(event.capacity, confirmed), event })
    }
}
