//! Domain types for slot booking.
//!
//! Events own an ordered list of slot labels and a uniform per-slot capacity.
//! Bookings reference an event and one of its slot labels. Identifiers are
//! assigned by the store on creation and never change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event, assigned by the [`EventStore`](crate::event_store::EventStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Wrap a raw store identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking, assigned by the [`BookingStore`](crate::booking_store::BookingStore).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(i64);

impl BookingId {
    /// Wrap a raw store identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The serialization key for admission decisions: one event, one slot label.
///
/// Admission scopes opened for equal keys are linearized by the store; scopes
/// for different keys never wait on each other.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    /// Event the slot belongs to
    pub event_id: EventId,
    /// Slot label within the event
    pub slot: String,
}

impl SlotKey {
    /// Create a new slot key.
    #[must_use]
    pub fn new(event_id: EventId, slot: impl Into<String>) -> Self {
        Self {
            event_id,
            slot: slot.into(),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event_id, self.slot)
    }
}

// ============================================================================
// Events
// ============================================================================

/// The organizer-supplied fields of an event.
///
/// Used both for creation and for full-replacement updates; there is no
/// partial update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Event title (non-empty)
    pub title: String,
    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Start of the event
    pub start_time: DateTime<Utc>,
    /// End of the event (after `start_time`)
    pub end_time: DateTime<Utc>,
    /// Organizer identity
    pub organizer: String,
    /// Ordered slot labels that attendees may book
    #[serde(default)]
    pub slots: Vec<String>,
    /// Capacity applied to every slot label
    pub max_bookings: u32,
}

/// A persisted event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned identifier
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    /// Start of the event
    pub start_time: DateTime<Utc>,
    /// End of the event
    pub end_time: DateTime<Utc>,
    /// Organizer identity
    pub organizer: String,
    /// Ordered slot labels
    pub slots: Vec<String>,
    /// Capacity applied to every slot label
    pub max_bookings: u32,
}

impl Event {
    /// Attach a store-assigned id to organizer-supplied fields.
    #[must_use]
    pub fn from_new(id: EventId, new: NewEvent) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            start_time: new.start_time,
            end_time: new.end_time,
            organizer: new.organizer,
            slots: new.slots,
            max_bookings: new.max_bookings,
        }
    }

    /// Returns `true` if `slot` is one of this event's slot labels.
    #[must_use]
    pub fn has_slot(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s == slot)
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// The caller-supplied fields of a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    /// Event being booked
    pub event_id: EventId,
    /// Attendee display name (non-empty)
    pub attendee_name: String,
    /// Attendee email, the identity used for duplicate detection
    pub attendee_email: String,
    /// Slot label within the event
    pub slot: String,
    /// When the reservation was made
    pub booked_at: DateTime<Utc>,
}

impl NewBooking {
    /// The admission key this booking competes for.
    #[must_use]
    pub fn slot_key(&self) -> SlotKey {
        SlotKey::new(self.event_id, self.slot.clone())
    }
}

/// A persisted booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Store-assigned identifier
    pub id: BookingId,
    /// Event being booked
    pub event_id: EventId,
    /// Attendee display name
    pub attendee_name: String,
    /// Attendee email
    pub attendee_email: String,
    /// Slot label within the event
    pub slot: String,
    /// When the reservation was made
    pub booked_at: DateTime<Utc>,
}

impl Booking {
    /// Attach a store-assigned id to caller-supplied fields.
    #[must_use]
    pub fn from_new(id: BookingId, new: NewBooking) -> Self {
        Self {
            id,
            event_id: new.event_id,
            attendee_name: new.attendee_name,
            attendee_email: new.attendee_email,
            slot: new.slot,
            booked_at: new.booked_at,
        }
    }

    /// Returns `true` if this booking occupies `key`.
    #[must_use]
    pub fn occupies(&self, key: &SlotKey) -> bool {
        self.event_id == key.event_id && self.slot == key.slot
    }

    /// Returns `true` if this booking and `other` collide on
    /// `(event_id, slot, attendee_email)`.
    #[must_use]
    pub fn collides_with(&self, other: &NewBooking) -> bool {
        self.event_id == other.event_id
            && self.slot == other.slot
            && self.attendee_email == other.attendee_email
    }
}

impl From<Booking> for NewBooking {
    fn from(booking: Booking) -> Self {
        Self {
            event_id: booking.event_id,
            attendee_name: booking.attendee_name,
            attendee_email: booking.attendee_email,
            slot: booking.slot,
            booked_at: booking.booked_at,
        }
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Offset/limit window over an id-ordered listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Number of records to skip
    pub offset: u32,
    /// Maximum number of records to return
    pub limit: u32,
}

impl Page {
    /// Largest limit a caller may request.
    pub const MAX_LIMIT: u32 = 100;

    /// Create a page window, clamping `limit` to [`Page::MAX_LIMIT`].
    #[must_use]
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.min(Self::MAX_LIMIT),
        }
    }

    /// Apply this window to an already-ordered iterator.
    pub fn apply<T>(self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, 10)
    }
}
