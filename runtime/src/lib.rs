//! # Slot Booking Runtime
//!
//! The decision procedure and application service for slot booking.
//!
//! ## Core Components
//!
//! - **[`AdmissionEngine`]**: decides a booking request under the slot's
//!   serialized scope, retrying on store contention
//! - **[`BookingService`]**: every external event and booking operation,
//!   with validation and clock-stamped defaults
//! - **Retry**: jittered exponential backoff for transient store failures
//! - **Metrics**: Prometheus counters and latency histogram for decisions
//!
//! ## Example
//!
//! ```ignore
//! use slot_booking_runtime::BookingService;
//! use slot_booking_core::environment::SystemClock;
//!
//! let service = BookingService::new(events, bookings, Arc::new(SystemClock));
//! let event = service.create_event(new_event).await?;
//! let booking = service.request_booking(draft).await?;
//! ```

/// Admission decisions per `(event, slot)`
pub mod admission;

/// Retry logic with exponential backoff
pub mod retry;

/// Prometheus metrics for observability
pub mod metrics;

/// Event and booking operations
pub mod service;

pub use admission::AdmissionEngine;
pub use retry::{RetryError, RetryPolicy};
pub use service::{BookingDraft, BookingService, ServiceError};
