//! Admission request and outcome types.
//!
//! A booking request either becomes a [`Booking`] or is refused with one of
//! four [`Rejection`] reasons. Rejections are ordinary outcomes, not errors:
//! only store failures end up in [`AdmissionError`].

use crate::event_store::StoreError;
use crate::types::{Booking, EventId, NewBooking, SlotKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A request to reserve one slot of one event for one attendee.
///
/// Field format (non-empty name, well-formed email) is validated before the
/// request reaches the admission engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Event to book
    pub event_id: EventId,
    /// Slot label to book
    pub slot: String,
    /// Attendee display name
    pub attendee_name: String,
    /// Attendee email
    pub attendee_email: String,
    /// When the reservation is made
    pub booked_at: DateTime<Utc>,
}

impl BookingRequest {
    /// The key this request competes for.
    #[must_use]
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.event_id, self.slot.clone())
    }

    /// The booking that is persisted if the request is admitted.
    #[must_use]
    pub fn to_new_booking(&self) -> NewBooking {
        NewBooking {
            event_id: self.event_id,
            attendee_name: self.attendee_name.clone(),
            attendee_email: self.attendee_email.clone(),
            slot: self.slot.clone(),
            booked_at: self.booked_at,
        }
    }
}

impl From<NewBooking> for BookingRequest {
    fn from(booking: NewBooking) -> Self {
        Self {
            event_id: booking.event_id,
            slot: booking.slot,
            attendee_name: booking.attendee_name,
            attendee_email: booking.attendee_email,
            booked_at: booking.booked_at,
        }
    }
}

/// Why a booking request was refused.
///
/// Each reason has a distinct, stable [`code`](Rejection::code) so callers can
/// tell them apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejection {
    /// The event id does not resolve to an event.
    EventNotFound,
    /// The slot label is not one of the event's slots.
    InvalidSlot,
    /// The attendee already holds this slot of this event.
    DuplicateBooking,
    /// The slot has reached the event's capacity.
    SlotFull,
}

impl Rejection {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EventNotFound => "EVENT_NOT_FOUND",
            Self::InvalidSlot => "INVALID_SLOT",
            Self::DuplicateBooking => "DUPLICATE_BOOKING",
            Self::SlotFull => "SLOT_FULL",
        }
    }

    /// Human-readable message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::EventNotFound => "Event not found.",
            Self::InvalidSlot => "Slot not valid for this event.",
            Self::DuplicateBooking => "You have already booked this slot.",
            Self::SlotFull => "Slot already fully booked.",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of an admission decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The booking was committed.
    Accepted(Booking),
    /// The request was refused; nothing was written.
    Rejected(Rejection),
}

impl Admission {
    /// The committed booking, if accepted.
    #[must_use]
    pub const fn booking(&self) -> Option<&Booking> {
        match self {
            Self::Accepted(booking) => Some(booking),
            Self::Rejected(_) => None,
        }
    }

    /// The rejection reason, if refused.
    #[must_use]
    pub const fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }

    /// Short outcome label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "accepted",
            Self::Rejected(Rejection::EventNotFound) => "event_not_found",
            Self::Rejected(Rejection::InvalidSlot) => "invalid_slot",
            Self::Rejected(Rejection::DuplicateBooking) => "duplicate_booking",
            Self::Rejected(Rejection::SlotFull) => "slot_full",
        }
    }
}

/// Failures of the admission engine that are not business rejections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// Store contention persisted through every retry. The caller may retry
    /// the whole request later.
    #[error("Store remained busy after {attempts} attempts: {source}")]
    Transient {
        /// Number of attempts made
        attempts: usize,
        /// The last contention error
        source: StoreError,
    },

    /// Non-retryable store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdmissionError {
    /// Returns `true` if the request may succeed when retried later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn rejection_codes_are_distinct() {
        let all = [
            Rejection::EventNotFound,
            Rejection::InvalidSlot,
            Rejection::DuplicateBooking,
            Rejection::SlotFull,
        ];
        let codes: HashSet<_> = all.iter().map(|r| r.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn rejection_serializes_as_code() {
        let json = serde_json::to_string(&Rejection::SlotFull).unwrap();
        assert_eq!(json, "\"SLOT_FULL\"");
        let json = serde_json::to_string(&Rejection::DuplicateBooking).unwrap();
        assert_eq!(json, "\"DUPLICATE_BOOKING\"");
    }

    #[test]
    fn request_round_trips_through_new_booking() {
        let request = BookingRequest {
            event_id: EventId::new(4),
            slot: "9am".to_string(),
            attendee_name: "Ada".to_string(),
            attendee_email: "ada@example.com".to_string(),
            booked_at: Utc::now(),
        };
        let booking = request.to_new_booking();
        assert_eq!(booking.slot_key(), request.slot_key());
        assert_eq!(BookingRequest::from(booking), request);
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        let transient = AdmissionError::Transient {
            attempts: 4,
            source: StoreError::Conflict("deadlock".to_string()),
        };
        assert!(transient.is_retryable());
        assert!(transient.to_string().contains("4 attempts"));
        assert!(!AdmissionError::Store(StoreError::Database("down".to_string())).is_retryable());
    }
}
