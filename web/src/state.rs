//! Application state for Axum handlers.

use slot_booking_runtime::BookingService;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Event and booking operations
    pub service: Arc<BookingService>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(service: BookingService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
