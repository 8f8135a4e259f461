//! The admission engine: decides whether a booking request becomes a booking.
//!
//! # Decision sequence
//!
//! 1. The event must exist, otherwise [`Rejection::EventNotFound`].
//! 2. The slot must be one of the event's slots, otherwise
//!    [`Rejection::InvalidSlot`].
//! 3. Under the slot's [`SlotScope`](slot_booking_core::SlotScope):
//!    - the attendee must not already hold the slot
//!      ([`Rejection::DuplicateBooking`])
//!    - the slot must have room ([`Rejection::SlotFull`])
//!    - the booking is inserted and the scope committed
//!
//! Step 3 is an atomic test-and-set per `(event_id, slot)`: the store
//! serializes scopes for one key, so two requests can never both observe the
//! last free seat. The whole sequence is rerun when the store reports
//! contention, up to the engine's [`RetryPolicy`].

use crate::metrics::AdmissionMetrics;
use crate::retry::{RetryError, RetryPolicy, retry_with_predicate};
use slot_booking_core::{
    Admission, AdmissionError, BookingRequest, BookingStore, EventStore, Rejection, StoreError,
};
use std::sync::Arc;
use std::time::Instant;

/// Serializes competing booking requests per slot and enforces capacity and
/// uniqueness.
#[derive(Clone)]
pub struct AdmissionEngine {
    events: Arc<dyn EventStore>,
    bookings: Arc<dyn BookingStore>,
    retry: RetryPolicy,
}

impl AdmissionEngine {
    /// Create an engine over the given stores with the default retry policy.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, bookings: Arc<dyn BookingStore>) -> Self {
        Self {
            events,
            bookings,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used for store contention.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The retry policy in effect.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Decide a booking request.
    ///
    /// Returns `Ok(Admission::Accepted)` with the committed booking, or
    /// `Ok(Admission::Rejected)` with the reason. A rejected request writes
    /// nothing.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::Transient`] if store contention outlasted every retry
    /// - [`AdmissionError::Store`] if the store failed for any other reason
    #[tracing::instrument(
        skip(self, request),
        name = "request_booking",
        fields(event_id = %request.event_id, slot = %request.slot)
    )]
    pub async fn request_booking(
        &self,
        request: BookingRequest,
    ) -> Result<Admission, AdmissionError> {
        let started = Instant::now();
        let mut attempts = 0_usize;

        let result = retry_with_predicate(
            &self.retry,
            || {
                attempts += 1;
                if attempts > 1 {
                    AdmissionMetrics::record_retry();
                }
                self.attempt(&request)
            },
            StoreError::is_transient,
        )
        .await
        .map_err(|err| match err {
            RetryError::Permanent(source) => AdmissionError::Store(source),
            RetryError::Exhausted { attempts, last } => AdmissionError::Transient {
                attempts,
                source: last,
            },
        });

        match &result {
            Ok(Admission::Accepted(booking)) => {
                tracing::info!(booking_id = %booking.id, "Booking admitted");
            }
            Ok(Admission::Rejected(reason)) => {
                tracing::info!(reason = reason.code(), "Booking rejected");
            }
            Err(err @ AdmissionError::Transient { .. }) => {
                tracing::warn!(error = %err, "Admission gave up on a busy store");
            }
            Err(err) => {
                tracing::error!(error = %err, "Admission failed");
            }
        }
        AdmissionMetrics::record(&result, started.elapsed());
        result
    }

    /// One pass through the decision sequence.
    async fn attempt(&self, request: &BookingRequest) -> Result<Admission, StoreError> {
        let Some(event) = self.events.get(request.event_id).await? else {
            return Ok(Admission::Rejected(Rejection::EventNotFound));
        };
        if !event.has_slot(&request.slot) {
            return Ok(Admission::Rejected(Rejection::InvalidSlot));
        }

        let mut scope = self.bookings.open_slot(request.slot_key()).await?;
        let occupancy = scope.occupancy(&request.attendee_email).await?;
        if occupancy.is_held() {
            return Ok(Admission::Rejected(Rejection::DuplicateBooking));
        }
        if !occupancy.has_room(event.max_bookings) {
            return Ok(Admission::Rejected(Rejection::SlotFull));
        }

        let booking = match scope.insert(request.to_new_booking()).await {
            Ok(booking) => booking,
            Err(err) => return constraint_rejection(err).map(Admission::Rejected),
        };
        match scope.commit().await {
            Ok(()) => Ok(Admission::Accepted(booking)),
            Err(err) => constraint_rejection(err).map(Admission::Rejected),
        }
    }
}

/// Constraint violations raised at insert or commit time are business
/// outcomes; everything else stays a store error.
fn constraint_rejection(err: StoreError) -> Result<Rejection, StoreError> {
    match err {
        StoreError::UniqueViolation => Ok(Rejection::DuplicateBooking),
        StoreError::EventMissing(_) => Ok(Rejection::EventNotFound),
        other => Err(other),
    }
}
