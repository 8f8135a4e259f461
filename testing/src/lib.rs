//! # Slot Booking Testing
//!
//! Testing utilities for the slot booking workspace.
//!
//! This crate provides:
//! - [`InMemoryStore`]: a single-process [`EventStore`](slot_booking_core::EventStore)
//!   and [`BookingStore`](slot_booking_core::BookingStore) with per-slot
//!   serialization and contention injection
//! - [`FixedClock`]: deterministic time
//! - [`fixtures`]: builders for events and booking requests
//!
//! ## Example
//!
//! ```ignore
//! use slot_booking_runtime::AdmissionEngine;
//! use slot_booking_testing::{fixtures, InMemoryStore};
//!
//! #[tokio::test]
//! async fn last_seat() {
//!     let store = Arc::new(InMemoryStore::new());
//!     let engine = AdmissionEngine::new(store.clone(), store.clone());
//!     let event = store.create(fixtures::new_event(&["9am"], 1)).await?;
//!
//!     let first = engine.request_booking(fixtures::booking_request(event.id, "9am", "a@example.com")).await?;
//!     assert!(first.booking().is_some());
//! }
//! ```

use chrono::{DateTime, Utc};
use slot_booking_core::environment::Clock;

pub mod memory;

pub use memory::InMemoryStore;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_booking_testing::mocks::FixedClock;
    /// use slot_booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Builders for events and booking requests.
///
/// Times are anchored to [`test_clock`] so fixtures are reproducible.
pub mod fixtures {
    use super::mocks::test_clock;
    use super::Clock;
    use chrono::Duration;
    use slot_booking_core::types::{EventId, NewEvent};
    use slot_booking_core::BookingRequest;

    /// A valid event starting one day after the test clock, two hours long.
    #[must_use]
    pub fn new_event(slots: &[&str], max_bookings: u32) -> NewEvent {
        let start_time = test_clock().now() + Duration::days(1);
        NewEvent {
            title: "Office hours".to_string(),
            description: Some("Drop-in questions".to_string()),
            start_time,
            end_time: start_time + Duration::hours(2),
            organizer: "organizer@example.com".to_string(),
            slots: slots.iter().map(ToString::to_string).collect(),
            max_bookings,
        }
    }

    /// A valid request; the attendee name is derived from the email.
    #[must_use]
    pub fn booking_request(event_id: EventId, slot: &str, attendee_email: &str) -> BookingRequest {
        let name = attendee_email
            .split_once('@')
            .map_or(attendee_email, |(local, _)| local);
        BookingRequest {
            event_id,
            slot: slot.to_string(),
            attendee_name: format!("Attendee {name}"),
            attendee_email: attendee_email.to_string(),
            booked_at: test_clock().now(),
        }
    }

    /// `count` distinct attendee addresses.
    #[must_use]
    pub fn attendee_emails(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("attendee{i}@example.com"))
            .collect()
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
