//! Slot occupancy: how full a slot is, and who already holds it.

use crate::types::{Booking, Event};
use serde::{Deserialize, Serialize};

/// Occupancy of one `(event, slot)` key as seen by one attendee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotOccupancy {
    /// Bookings currently recorded for the key
    pub booked: u64,
    /// The booking the attendee already holds for the key, if any
    pub existing: Option<Booking>,
}

impl SlotOccupancy {
    /// Returns `true` if one more booking fits under `capacity`.
    #[must_use]
    pub const fn has_room(&self, capacity: u32) -> bool {
        self.booked < capacity as u64
    }

    /// Returns `true` if the attendee already holds the key.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.existing.is_some()
    }
}

/// Availability of a single slot label, for display to attendees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    /// Slot label
    pub slot: String,
    /// Capacity of the slot
    pub capacity: u32,
    /// Bookings recorded for the slot
    pub booked: u64,
    /// Seats left (zero when the slot is full or over-booked administratively)
    pub remaining: u64,
}

impl SlotAvailability {
    /// Build availability for `slot` of `event` from a booked count.
    #[must_use]
    pub fn new(event: &Event, slot: impl Into<String>, booked: u64) -> Self {
        let capacity = event.max_bookings;
        Self {
            slot: slot.into(),
            capacity,
            booked,
            remaining: u64::from(capacity).saturating_sub(booked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventId, NewEvent};
    use chrono::Utc;
    use proptest::prelude::*;

    fn event_with_capacity(max_bookings: u32) -> Event {
        let now = Utc::now();
        Event::from_new(
            EventId::new(1),
            NewEvent {
                title: "Demo".to_string(),
                description: None,
                start_time: now,
                end_time: now + chrono::Duration::hours(1),
                organizer: "org".to_string(),
                slots: vec!["a".to_string()],
                max_bookings,
            },
        )
    }

    #[test]
    fn full_slot_has_no_room() {
        let occupancy = SlotOccupancy {
            booked: 3,
            existing: None,
        };
        assert!(!occupancy.has_room(3));
        assert!(occupancy.has_room(4));
        assert!(!occupancy.is_held());
    }

    #[test]
    fn over_booked_slot_reports_zero_remaining() {
        let availability = SlotAvailability::new(&event_with_capacity(2), "a", 5);
        assert_eq!(availability.remaining, 0);
        assert_eq!(availability.booked, 5);
    }

    proptest! {
        #[test]
        fn room_iff_booked_below_capacity(booked in 0u64..1_000, capacity in 1u32..1_000) {
            let occupancy = SlotOccupancy { booked, existing: None };
            prop_assert_eq!(occupancy.has_room(capacity), booked < u64::from(capacity));
        }

        #[test]
        fn remaining_plus_booked_covers_capacity(booked in 0u64..1_000, capacity in 1u32..1_000) {
            let availability = SlotAvailability::new(&event_with_capacity(capacity), "a", booked);
            prop_assert!(availability.remaining + availability.booked >= u64::from(capacity));
            prop_assert!(availability.remaining <= u64::from(capacity));
        }
    }
}
