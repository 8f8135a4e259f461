//! # Slot Booking Core
//!
//! Domain types, storage traits and the admission taxonomy for slot booking.
//!
//! An organizer publishes an [`Event`](types::Event) with a fixed list of slot
//! labels and a per-slot capacity; attendees request a slot. This crate defines
//! the vocabulary shared by every other crate in the workspace:
//!
//! - **Types**: events, bookings, slot keys, pagination
//! - **Stores**: [`EventStore`](event_store::EventStore) and
//!   [`BookingStore`](booking_store::BookingStore), with per-slot
//!   serialized [`SlotScope`](booking_store::SlotScope)s
//! - **Occupancy**: how full a slot is and who holds it
//! - **Admission**: requests, [`Rejection`](admission::Rejection) reasons and
//!   engine errors
//! - **Validation**: input format checks
//! - **Environment**: injected dependencies such as the clock
//!
//! The decision procedure itself lives in `slot-booking-runtime`; storage
//! implementations live in `slot-booking-postgres` and `slot-booking-testing`.

pub mod admission;
pub mod booking_store;
pub mod event_store;
pub mod occupancy;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub use admission::{Admission, AdmissionError, BookingRequest, Rejection};
pub use booking_store::{BookingStore, SlotScope};
pub use event_store::{EventStore, StoreError, StoreFuture};
pub use occupancy::{SlotAvailability, SlotOccupancy};
pub use types::{Booking, BookingId, Event, EventId, NewBooking, NewEvent, Page, SlotKey};
pub use validation::ValidationError;

/// Environment module - injected dependencies
///
/// All external dependencies the runtime needs besides the stores are
/// abstracted behind traits so tests can substitute deterministic versions.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Used to stamp `booked_at` when a caller does not supply one.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
