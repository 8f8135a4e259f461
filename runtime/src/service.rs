//! Application service: every external operation on events and bookings.
//!
//! Validates input, stamps defaults from the injected clock and delegates to
//! the stores. Booking creation always goes through the [`AdmissionEngine`].

use crate::admission::AdmissionEngine;
use crate::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use slot_booking_core::environment::Clock;
use slot_booking_core::validation::{
    ValidationError, validate_booking, validate_booking_request, validate_event,
};
use slot_booking_core::{
    Admission, AdmissionError, Booking, BookingId, BookingRequest, BookingStore, Event, EventId,
    EventStore, NewBooking, NewEvent, Page, Rejection, SlotAvailability, SlotKey, StoreError,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by [`BookingService`].
///
/// Missing records are not errors: lookups return `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// A field failed format validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The admission engine refused the booking.
    #[error("{}", .0.message())]
    Rejected(Rejection),

    /// The admission engine could not reach a decision.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// A storage operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A booking request as submitted by an attendee.
///
/// `booked_at` defaults to the service clock when omitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingDraft {
    /// Event to book
    pub event_id: EventId,
    /// Slot label to book
    pub slot: String,
    /// Attendee display name
    pub attendee_name: String,
    /// Attendee email
    pub attendee_email: String,
    /// Reservation time, if the caller supplies one
    pub booked_at: Option<DateTime<Utc>>,
}

/// Event and booking operations over a pair of stores.
#[derive(Clone)]
pub struct BookingService {
    events: Arc<dyn EventStore>,
    bookings: Arc<dyn BookingStore>,
    engine: AdmissionEngine,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    /// Create a service over the given stores and clock.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        bookings: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = AdmissionEngine::new(Arc::clone(&events), Arc::clone(&bookings));
        Self {
            events,
            bookings,
            engine,
            clock,
        }
    }

    /// Replace the admission retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.engine = self.engine.with_retry_policy(retry);
        self
    }

    /// The admission engine used for booking requests.
    #[must_use]
    pub const fn engine(&self) -> &AdmissionEngine {
        &self.engine
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Publish a new event.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed fields, `Store` if persisting fails.
    #[tracing::instrument(skip(self, event), fields(title = %event.title))]
    pub async fn create_event(&self, event: NewEvent) -> Result<Event, ServiceError> {
        validate_event(&event)?;
        let event = self.events.create(event).await?;
        tracing::info!(event_id = %event.id, slots = event.slots.len(), "Event created");
        Ok(event)
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the lookup fails.
    pub async fn get_event(&self, id: EventId) -> Result<Option<Event>, ServiceError> {
        Ok(self.events.get(id).await?)
    }

    /// One page of events, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the query fails.
    pub async fn list_events(&self, page: Page) -> Result<Vec<Event>, ServiceError> {
        Ok(self.events.list(page).await?)
    }

    /// Replace every organizer-supplied field of an event.
    ///
    /// Existing bookings are left untouched, even if the new slot list or
    /// capacity no longer covers them.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed fields, `Store` if the update fails.
    #[tracing::instrument(skip(self, event))]
    pub async fn update_event(
        &self,
        id: EventId,
        event: NewEvent,
    ) -> Result<Option<Event>, ServiceError> {
        validate_event(&event)?;
        Ok(self.events.update(id, event).await?)
    }

    /// Delete an event together with its bookings.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the delete fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete_event(&self, id: EventId) -> Result<Option<Event>, ServiceError> {
        let deleted = self.events.delete(id).await?;
        if deleted.is_some() {
            tracing::info!(event_id = %id, "Event deleted");
        }
        Ok(deleted)
    }

    /// Capacity, booked count and remaining seats for every slot of an event.
    ///
    /// A point-in-time read; it may be stale by the time it is returned.
    ///
    /// # Errors
    ///
    /// Returns `Store` if a read fails.
    pub async fn slot_availability(
        &self,
        id: EventId,
    ) -> Result<Option<Vec<SlotAvailability>>, ServiceError> {
        let Some(event) = self.events.get(id).await? else {
            return Ok(None);
        };
        let mut availability = Vec::with_capacity(event.slots.len());
        for slot in &event.slots {
            let booked = self.bookings.count(&SlotKey::new(id, slot.clone())).await?;
            availability.push(SlotAvailability::new(&event, slot.clone(), booked));
        }
        Ok(Some(availability))
    }

    // ========================================================================
    // Bookings
    // ========================================================================

    /// Ask for a slot.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank name or malformed email
    /// - `Rejected` with the admission engine's reason
    /// - `Admission` if the store stayed busy or failed
    pub async fn request_booking(&self, draft: BookingDraft) -> Result<Booking, ServiceError> {
        let request = BookingRequest {
            event_id: draft.event_id,
            slot: draft.slot,
            attendee_name: draft.attendee_name,
            attendee_email: draft.attendee_email,
            booked_at: draft.booked_at.unwrap_or_else(|| self.clock.now()),
        };
        validate_booking_request(&request)?;

        match self.engine.request_booking(request).await? {
            Admission::Accepted(booking) => Ok(booking),
            Admission::Rejected(reason) => Err(ServiceError::Rejected(reason)),
        }
    }

    /// Look up a booking.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the lookup fails.
    pub async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, ServiceError> {
        Ok(self.bookings.get(id).await?)
    }

    /// One page of bookings, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the query fails.
    pub async fn list_bookings(&self, page: Page) -> Result<Vec<Booking>, ServiceError> {
        Ok(self.bookings.list(page).await?)
    }

    /// One page of an event's bookings, or `None` if the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Store` if a query fails.
    pub async fn list_bookings_for_event(
        &self,
        event_id: EventId,
        page: Page,
    ) -> Result<Option<Vec<Booking>>, ServiceError> {
        if self.events.get(event_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.bookings.list_for_event(event_id, page).await?))
    }

    /// One page of an attendee's bookings across all events.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the query fails.
    pub async fn list_bookings_for_attendee(
        &self,
        email: &str,
        page: Page,
    ) -> Result<Vec<Booking>, ServiceError> {
        Ok(self.bookings.list_for_attendee(email, page).await?)
    }

    /// Replace a booking on the administrative path.
    ///
    /// Slot membership and capacity are not re-checked. The store still refuses
    /// a second booking of the same attendee for the same slot and a booking
    /// that points at a missing event.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank name or malformed email
    /// - `Rejected(DuplicateBooking)` or `Rejected(EventNotFound)` on a
    ///   constraint violation
    /// - `Store` if the update fails
    #[tracing::instrument(skip(self, booking))]
    pub async fn update_booking(
        &self,
        id: BookingId,
        booking: NewBooking,
    ) -> Result<Option<Booking>, ServiceError> {
        validate_booking(&booking)?;
        match self.bookings.update(id, booking).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::UniqueViolation) => {
                Err(ServiceError::Rejected(Rejection::DuplicateBooking))
            }
            Err(StoreError::EventMissing(_)) => Err(ServiceError::Rejected(Rejection::EventNotFound)),
            Err(err) => Err(err.into()),
        }
    }

    /// Cancel a booking, freeing its seat.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the delete fails.
    #[tracing::instrument(skip(self))]
    pub async fn delete_booking(&self, id: BookingId) -> Result<Option<Booking>, ServiceError> {
        let deleted = self.bookings.delete(id).await?;
        if let Some(booking) = &deleted {
            tracing::info!(booking_id = %id, event_id = %booking.event_id, "Booking cancelled");
        }
        Ok(deleted)
    }
}
