//! Booking store trait and per-slot admission scopes.
//!
//! The booking store owns [`Booking`] records. Like the event store it carries
//! no policy, but it is responsible for one concurrency guarantee: a
//! [`SlotScope`] opened for a [`SlotKey`] is serialized against every other
//! scope for the same key. The admission engine runs its duplicate check,
//! capacity check and insert inside one scope, which turns the sequence into an
//! atomic test-and-set.
//!
//! # Scope lifecycle
//!
//! ```text
//! open_slot(key) ──► occupancy(email) ──► insert(booking) ──► commit()
//!        │                  │                    │
//!        └──────────────────┴────────────────────┴──► drop  (nothing persisted)
//! ```
//!
//! A scope that is dropped without `commit()` (rejection, error, or a caller
//! abandoning the request) leaves no trace in the store.

use crate::event_store::{StoreError, StoreFuture};
use crate::occupancy::SlotOccupancy;
use crate::types::{Booking, BookingId, EventId, NewBooking, Page, SlotKey};
use std::future::Future;
use std::pin::Pin;

/// An open, key-serialized unit of work against the booking store.
///
/// While a scope is alive no other scope for the same key can observe or
/// change that key's occupancy. Scopes for different keys proceed in parallel.
pub trait SlotScope: Send {
    /// The key this scope serializes on.
    fn key(&self) -> &SlotKey;

    /// Read the key's occupancy, including bookings inserted through this
    /// scope, and look up any booking `attendee_email` already holds.
    ///
    /// # Errors
    ///
    /// - `Conflict`: transient contention, retryable
    /// - `Database`: the query failed
    fn occupancy<'a>(&'a mut self, attendee_email: &'a str) -> StoreFuture<'a, SlotOccupancy>;

    /// Stage a booking for this scope's key and return it with its assigned id.
    ///
    /// The booking becomes visible to other readers only after [`commit`](Self::commit).
    ///
    /// # Errors
    ///
    /// - `UniqueViolation`: `(event_id, slot, attendee_email)` is already taken
    /// - `EventMissing`: the referenced event no longer exists
    /// - `Conflict`: transient contention, retryable
    /// - `Database`: the insert failed
    fn insert(&mut self, booking: NewBooking) -> StoreFuture<'_, Booking>;

    /// Make staged bookings durable and release the key.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert); constraint checks may be deferred to
    /// commit time by some stores.
    fn commit(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>>;
}

/// Storage for [`Booking`] records.
///
/// Direct creation is deliberately absent: new bookings are only written
/// through a [`SlotScope`]. Administrative `update` and `delete` act on single
/// records without re-running admission checks, but stores still enforce
/// `(event_id, slot, attendee_email)` uniqueness and the reference to the event.
pub trait BookingStore: Send + Sync {
    /// Open a serialized admission scope for `key`.
    ///
    /// Waits while another scope for the same key is open.
    ///
    /// # Errors
    ///
    /// - `Conflict`: the key could not be acquired in time, retryable
    /// - `Database`: a connection or transaction could not be started
    fn open_slot(&self, key: SlotKey) -> StoreFuture<'_, Box<dyn SlotScope>>;

    /// Load a booking by id.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    fn get(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// List all bookings ordered by id.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    fn list(&self, page: Page) -> StoreFuture<'_, Vec<Booking>>;

    /// List the bookings of one event ordered by id.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    fn list_for_event(&self, event_id: EventId, page: Page) -> StoreFuture<'_, Vec<Booking>>;

    /// List the bookings held by one attendee email ordered by id.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    fn list_for_attendee<'a>(&'a self, email: &'a str, page: Page)
    -> StoreFuture<'a, Vec<Booking>>;

    /// Number of bookings currently recorded for `key`.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    fn count<'a>(&'a self, key: &'a SlotKey) -> StoreFuture<'a, u64>;

    /// The booking `attendee_email` holds for `key`, if any.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    fn find<'a>(&'a self, key: &'a SlotKey, attendee_email: &'a str)
    -> StoreFuture<'a, Option<Booking>>;

    /// Replace every field of a booking (administrative path).
    ///
    /// Returns `None` if no booking has this id.
    ///
    /// # Errors
    ///
    /// - `UniqueViolation`: the new `(event_id, slot, attendee_email)` is taken
    /// - `EventMissing`: the new `event_id` does not exist
    /// - `Database`: the update failed
    fn update(&self, id: BookingId, booking: NewBooking) -> StoreFuture<'_, Option<Booking>>;

    /// Delete a booking, returning it, or `None` if no booking has this id.
    ///
    /// # Errors
    ///
    /// - `Database`: the delete failed
    fn delete(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>>;

    /// Point-in-time occupancy of `key` for `attendee_email`, read outside any
    /// scope.
    ///
    /// The result may be stale by the time the caller acts on it; admission
    /// decisions must use [`SlotScope::occupancy`] instead.
    ///
    /// # Errors
    ///
    /// - `Database`: a query failed
    fn occupancy<'a>(
        &'a self,
        key: &'a SlotKey,
        attendee_email: &'a str,
    ) -> StoreFuture<'a, SlotOccupancy> {
        Box::pin(async move {
            let booked = self.count(key).await?;
            let existing = self.find(key, attendee_email).await?;
            Ok(SlotOccupancy { booked, existing })
        })
    }
}
