//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain:
//! - Health: liveness and readiness probes
//! - Events: event CRUD, availability and per-event bookings
//! - Bookings: admission, booking CRUD and attendee lookups

pub mod bookings;
pub mod events;
pub mod health;

use serde::Deserialize;
use slot_booking_core::Page;

// Re-export common handler utilities
pub use health::{health_check, readiness_check};

/// Default page size for event and booking listings.
pub const DEFAULT_LIMIT: u32 = 10;

/// Default page size for attendee lookups.
pub const DEFAULT_ATTENDEE_LIMIT: u32 = 20;

/// `offset` / `limit` query parameters shared by every listing.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Records to skip (default 0)
    #[serde(default)]
    pub offset: u32,
    /// Page size (capped at 100)
    pub limit: Option<u32>,
}

impl PageParams {
    /// Resolve to a [`Page`], using `default_limit` when no limit was given.
    #[must_use]
    pub fn page(&self, default_limit: u32) -> Page {
        Page::new(self.offset, self.limit.unwrap_or(default_limit))
    }
}
