//! In-memory event and booking storage.
//!
//! One [`InMemoryStore`] implements both [`EventStore`] and [`BookingStore`]
//! over shared tables, so event deletion can cascade to bookings and scope
//! commits can check that their event still exists.
//!
//! # Concurrency
//!
//! Each [`SlotKey`] maps to its own async mutex. Opening a scope acquires that
//! mutex and holds it until the scope is committed or dropped, so scopes for
//! the same key are linearized while different keys never wait on each other.
//! The tables themselves sit behind a short-lived synchronous mutex that is
//! never held across an `.await`.

use slot_booking_core::booking_store::{BookingStore, SlotScope};
use slot_booking_core::event_store::{EventStore, StoreError, StoreFuture};
use slot_booking_core::occupancy::SlotOccupancy;
use slot_booking_core::types::{
    Booking, BookingId, Event, EventId, NewBooking, NewEvent, Page, SlotKey,
};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as KeyLock, OwnedMutexGuard};

#[derive(Debug, Default)]
struct Tables {
    events: BTreeMap<EventId, Event>,
    bookings: BTreeMap<BookingId, Booking>,
    last_event_id: i64,
    last_booking_id: i64,
}

impl Tables {
    fn next_event_id(&mut self) -> EventId {
        self.last_event_id += 1;
        EventId::new(self.last_event_id)
    }

    fn next_booking_id(&mut self) -> BookingId {
        self.last_booking_id += 1;
        BookingId::new(self.last_booking_id)
    }

    /// Foreign-key and uniqueness checks shared by scope inserts, commits and
    /// administrative updates.
    fn check_constraints(
        &self,
        event_id: EventId,
        slot: &str,
        attendee_email: &str,
        ignore: Option<BookingId>,
    ) -> Result<(), StoreError> {
        if !self.events.contains_key(&event_id) {
            return Err(StoreError::EventMissing(event_id));
        }
        let taken = self.bookings.values().any(|b| {
            Some(b.id) != ignore
                && b.event_id == event_id
                && b.slot == slot
                && b.attendee_email == attendee_email
        });
        if taken {
            return Err(StoreError::UniqueViolation);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    slot_locks: Mutex<HashMap<SlotKey, Arc<KeyLock<()>>>>,
    injected_conflicts: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
}

/// In-memory implementation of [`EventStore`] and [`BookingStore`].
///
/// Cloning is cheap and every clone shares the same data.
///
/// # Example
///
/// ```
/// use slot_booking_core::event_store::EventStore;
/// use slot_booking_testing::{fixtures, InMemoryStore};
///
/// # tokio_test_block_on(async {
/// let store = InMemoryStore::new();
/// let event = store.create(fixtures::new_event(&["9am"], 1)).await?;
/// assert_eq!(event.id.get(), 1);
/// # Ok::<(), slot_booking_core::StoreError>(())
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to [`BookingStore::open_slot`] fail with
    /// [`StoreError::Conflict`], as a contended database would.
    pub fn inject_conflicts(&self, count: usize) {
        self.shared
            .injected_conflicts
            .fetch_add(count, Ordering::SeqCst);
    }

    /// Every committed booking, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the store lock is poisoned.
    pub fn all_bookings(&self) -> Result<Vec<Booking>, StoreError> {
        Ok(lock(&self.shared.tables)?.bookings.values().cloned().collect())
    }

    fn take_injected_conflict(&self) -> bool {
        self.shared
            .injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn slot_lock(&self, key: &SlotKey) -> Result<Arc<KeyLock<()>>, StoreError> {
        let mut locks = lock(&self.shared.slot_locks)?;
        Ok(Arc::clone(locks.entry(key.clone()).or_default()))
    }
}

impl EventStore for InMemoryStore {
    fn create(&self, event: NewEvent) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut tables = lock(&self.shared.tables)?;
            let id = tables.next_event_id();
            let event = Event::from_new(id, event);
            tables.events.insert(id, event.clone());
            Ok(event)
        })
    }

    fn get(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move { Ok(lock(&self.shared.tables)?.events.get(&id).cloned()) })
    }

    fn list(&self, page: Page) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let tables = lock(&self.shared.tables)?;
            Ok(page.apply(tables.events.values().cloned()))
        })
    }

    fn update(&self, id: EventId, event: NewEvent) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let mut tables = lock(&self.shared.tables)?;
            Ok(tables.events.get_mut(&id).map(|stored| {
                *stored = Event::from_new(id, event);
                stored.clone()
            }))
        })
    }

    fn delete(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let removed = {
                let mut tables = lock(&self.shared.tables)?;
                let removed = tables.events.remove(&id);
                if removed.is_some() {
                    tables.bookings.retain(|_, b| b.event_id != id);
                }
                removed
            };
            if removed.is_some() {
                // Locks still held by an open scope stay until it drops
                lock(&self.shared.slot_locks)?
                    .retain(|key, held| key.event_id != id || Arc::strong_count(held) > 1);
            }
            Ok(removed)
        })
    }
}

impl BookingStore for InMemoryStore {
    fn open_slot(&self, key: SlotKey) -> StoreFuture<'_, Box<dyn SlotScope>> {
        Box::pin(async move {
            if self.take_injected_conflict() {
                return Err(StoreError::Conflict(format!("injected contention on {key}")));
            }
            let guard = self.slot_lock(&key)?.lock_owned().await;
            let scope: Box<dyn SlotScope> = Box::new(InMemorySlotScope {
                key,
                shared: Arc::clone(&self.shared),
                staged: Vec::new(),
                _guard: guard,
            });
            Ok(scope)
        })
    }

    fn get(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move { Ok(lock(&self.shared.tables)?.bookings.get(&id).cloned()) })
    }

    fn list(&self, page: Page) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let tables = lock(&self.shared.tables)?;
            Ok(page.apply(tables.bookings.values().cloned()))
        })
    }

    fn list_for_event(&self, event_id: EventId, page: Page) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let tables = lock(&self.shared.tables)?;
            Ok(page.apply(
                tables
                    .bookings
                    .values()
                    .filter(|b| b.event_id == event_id)
                    .cloned(),
            ))
        })
    }

    fn list_for_attendee<'a>(
        &'a self,
        email: &'a str,
        page: Page,
    ) -> StoreFuture<'a, Vec<Booking>> {
        Box::pin(async move {
            let tables = lock(&self.shared.tables)?;
            Ok(page.apply(
                tables
                    .bookings
                    .values()
                    .filter(|b| b.attendee_email == email)
                    .cloned(),
            ))
        })
    }

    fn count<'a>(&'a self, key: &'a SlotKey) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let tables = lock(&self.shared.tables)?;
            Ok(tables.bookings.values().filter(|b| b.occupies(key)).count() as u64)
        })
    }

    fn find<'a>(
        &'a self,
        key: &'a SlotKey,
        attendee_email: &'a str,
    ) -> StoreFuture<'a, Option<Booking>> {
        Box::pin(async move {
            let tables = lock(&self.shared.tables)?;
            Ok(tables
                .bookings
                .values()
                .find(|b| b.occupies(key) && b.attendee_email == attendee_email)
                .cloned())
        })
    }

    fn update(&self, id: BookingId, booking: NewBooking) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let mut tables = lock(&self.shared.tables)?;
            if !tables.bookings.contains_key(&id) {
                return Ok(None);
            }
            tables.check_constraints(
                booking.event_id,
                &booking.slot,
                &booking.attendee_email,
                Some(id),
            )?;
            let updated = Booking::from_new(id, booking);
            tables.bookings.insert(id, updated.clone());
            Ok(Some(updated))
        })
    }

    fn delete(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move { Ok(lock(&self.shared.tables)?.bookings.remove(&id)) })
    }
}

/// Scope holding one key's async mutex; inserts are staged until commit.
struct InMemorySlotScope {
    key: SlotKey,
    shared: Arc<Shared>,
    staged: Vec<Booking>,
    _guard: OwnedMutexGuard<()>,
}

impl SlotScope for InMemorySlotScope {
    fn key(&self) -> &SlotKey {
        &self.key
    }

    fn occupancy<'a>(&'a mut self, attendee_email: &'a str) -> StoreFuture<'a, SlotOccupancy> {
        Box::pin(async move {
            let tables = lock(&self.shared.tables)?;
            let mut occupancy = SlotOccupancy {
                booked: 0,
                existing: None,
            };
            let held = tables
                .bookings
                .values()
                .filter(|b| b.occupies(&self.key))
                .chain(self.staged.iter());
            for booking in held {
                occupancy.booked += 1;
                if occupancy.existing.is_none() && booking.attendee_email == attendee_email {
                    occupancy.existing = Some(booking.clone());
                }
            }
            Ok(occupancy)
        })
    }

    fn insert(&mut self, booking: NewBooking) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            if booking.slot_key() != self.key {
                return Err(StoreError::Database(format!(
                    "booking for {} inserted through scope for {}",
                    booking.slot_key(),
                    self.key
                )));
            }
            let mut tables = lock(&self.shared.tables)?;
            tables.check_constraints(
                booking.event_id,
                &booking.slot,
                &booking.attendee_email,
                None,
            )?;
            if self.staged.iter().any(|b| b.collides_with(&booking)) {
                return Err(StoreError::UniqueViolation);
            }
            let stored = Booking::from_new(tables.next_booking_id(), booking);
            self.staged.push(stored.clone());
            Ok(stored)
        })
    }

    fn commit(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>> {
        Box::pin(async move {
            let scope = *self;
            let mut tables = lock(&scope.shared.tables)?;
            // The event may have been deleted while the scope was open.
            for booking in &scope.staged {
                tables.check_constraints(
                    booking.event_id,
                    &booking.slot,
                    &booking.attendee_email,
                    None,
                )?;
            }
            for booking in &scope.staged {
                tables.bookings.insert(booking.id, booking.clone());
            }
            Ok(())
        })
    }
}
