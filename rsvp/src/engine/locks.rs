//! Per-event async mutual exclusion.
//!
//! Registrations for the same event queue up behind one `tokio` mutex while
//! registrations for different events run in parallel. Entries are dropped
//! from the map as soon as the last holder or waiter releases them, so the
//! map only ever contains events with work in flight.

use crate::types::EventId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type Slots = Arc<Mutex<HashMap<EventId, Arc<tokio::sync::Mutex<()>>>>>;

/// Registry of per-event locks.
#[derive(Debug, Default, Clone)]
pub struct EventLocks {
    slots: Slots,
}

impl EventLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task holds the lock for `event_id`, then take it.
    pub async fn acquire(&self, event_id: EventId) -> EventLockGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(event_id).or_default())
        };

        let guard = Arc::clone(&slot).lock_owned().await;

        EventLockGuard {
            event_id,
            slot,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of events with a holder or waiter.
    #[must_use]
    pub fn active(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held lock on one event. Released on drop.
#[derive(Debug)]
pub struct EventLockGuard {
    event_id: EventId,
    slot: Arc<tokio::sync::Mutex<()>>,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EventLockGuard {
    fn drop(&mut self) {
        // Release the mutex first so its own Arc no longer counts.
        drop(self.guard.take());

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.event_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_event_is_serialized() {
        let locks = EventLocks::new();
        let event_id = EventId::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                tokio::spawn(async move {
                    let _guard = locks.acquire(event_id).await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.is_ok());
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn different_events_do_not_block_each_other() {
        let locks = EventLocks::new();
        let _first = locks.acquire(EventId::new()).await;

        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(EventId::new())).await;

        assert!(second.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn entry_is_removed_after_release() {
        let locks = EventLocks::new();
        let event_id = EventId::new();

        {
            let _guard = locks.acquire(event_id).await;
            assert_eq!(locks.active(), 1);
        }

        assert_eq!(locks.active(), 0);
    }
}
