//! Event store trait and the shared storage error type.
//!
//! The event store owns [`Event`] records: their titles, time windows, slot
//! labels and per-slot capacity. It is pure storage. No cross-record invariant
//! is enforced here; admission policy lives in the runtime crate.
//!
//! # Implementations
//!
//! - `PostgresEventStore` (in `slot-booking-postgres`): production storage
//! - `InMemoryStore` (in `slot-booking-testing`): fast, deterministic tests
//!
//! # Example
//!
//! ```no_run
//! use slot_booking_core::event_store::{EventStore, StoreError};
//! use slot_booking_core::types::{EventId, Page};
//!
//! async fn first_page<E: EventStore>(store: &E) -> Result<(), StoreError> {
//!     let events = store.list(Page::default()).await?;
//!     if let Some(event) = store.get(EventId::new(1)).await? {
//!         println!("{} has {} slots", event.title, event.slots.len());
//!     }
//!     println!("{} events on the first page", events.len());
//!     Ok(())
//! }
//! ```

use crate::types::{Event, EventId, NewEvent, Page};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by store operations.
///
/// Store traits return `Pin<Box<dyn Future>>` instead of using `async fn` so
/// they stay dyn-compatible (`Arc<dyn EventStore>`).
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Errors that can occur during store operations.
///
/// "Not found" is not an error: lookups return `Option`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient contention: serialization failure, deadlock, lock or pool
    /// timeout. The operation may succeed if retried.
    #[error("Store contention: {0}")]
    Conflict(String),

    /// A booking with the same `(event_id, slot, attendee_email)` already exists.
    #[error("Booking already exists for this attendee and slot")]
    UniqueViolation,

    /// The referenced event does not exist (or was deleted concurrently).
    #[error("Event {0} does not exist")]
    EventMissing(EventId),

    /// Stored data could not be decoded into domain types.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Database connection or query failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Returns `true` if retrying the operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Storage for [`Event`] records.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single handle can be shared
/// across request tasks.
pub trait EventStore: Send + Sync {
    /// Persist a new event and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// - `Database`: the insert failed
    fn create(&self, event: NewEvent) -> StoreFuture<'_, Event>;

    /// Load an event by id.
    ///
    /// Returns `None` if no event has this id.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    /// - `Decode`: the stored row is malformed
    fn get(&self, id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// List events ordered by id.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    /// - `Decode`: a stored row is malformed
    fn list(&self, page: Page) -> StoreFuture<'_, Vec<Event>>;

    /// Replace every organizer-supplied field of an event.
    ///
    /// Returns `None` if no event has this id. Existing bookings are not
    /// re-validated against the new slot list or capacity.
    ///
    /// # Errors
    ///
    /// - `Database`: the update failed
    fn update(&self, id: EventId, event: NewEvent) -> StoreFuture<'_, Option<Event>>;

    /// Delete an event and, by cascade, all of its bookings.
    ///
    /// Returns the deleted event, or `None` if no event has this id.
    ///
    /// # Errors
    ///
    /// - `Database`: the delete failed
    fn delete(&self, id: EventId) -> StoreFuture<'_, Option<Event>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_transient() {
        assert!(StoreError::Conflict("40001".to_string()).is_transient());
        assert!(!StoreError::UniqueViolation.is_transient());
        assert!(!StoreError::EventMissing(EventId::new(1)).is_transient());
        assert!(!StoreError::Database("connection refused".to_string()).is_transient());
    }

    #[test]
    fn event_missing_display() {
        let error = StoreError::EventMissing(EventId::new(12));
        assert_eq!(error.to_string(), "Event 12 does not exist");
    }
}
