//! Axum HTTP surface for slot booking.
//!
//! Handlers are thin adapters over
//! [`BookingService`](slot_booking_runtime::BookingService): they parse the
//! request, call one service operation and map the result to a response.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at Axum handler
//! 2. **Extract data** from request (JSON, path, query)
//! 3. **Call** the service (validation, admission, stores)
//! 4. **Map result** to HTTP response, rejections included
//!
//! # Example
//!
//! ```ignore
//! use slot_booking_web::{AppState, router};
//!
//! let app = router(AppState::new(service));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id};
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use handlers::{bookings, events, health_check, readiness_check};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// Includes health probes, event and booking routes, the correlation-id
/// middleware and request tracing. CORS is left to the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Events
        .route("/events", post(events::create_event).get(events::list_events))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/availability", get(events::get_availability))
        .route(
            "/events/:id/bookings",
            get(events::list_event_bookings).post(events::create_event_booking),
        )
        // Bookings
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/users/:email/bookings", get(bookings::list_attendee_bookings))
        .layer(axum::middleware::from_fn(correlation_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
