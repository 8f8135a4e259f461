//! Event management API endpoints.
//!
//! - POST /events - Create a new event
//! - GET /events - List events with pagination
//! - GET /events/:id - Get event details
//! - PUT /events/:id - Replace an event
//! - DELETE /events/:id - Delete an event and its bookings
//! - GET /events/:id/availability - Seats left per slot
//! - GET /events/:id/bookings - Bookings of one event
//! - POST /events/:id/bookings - Book a slot of this event

use super::{DEFAULT_LIMIT, PageParams};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use slot_booking_core::{Booking, Event, EventId, NewEvent, SlotAvailability};
use slot_booking_runtime::BookingDraft;

/// Request to book a slot of the event named in the path.
#[derive(Debug, Deserialize)]
pub struct CreateEventBookingRequest {
    /// Slot label
    pub slot: String,
    /// Attendee display name
    pub attendee_name: String,
    /// Attendee email
    pub attendee_email: String,
    /// Reservation time (defaults to now)
    #[serde(default)]
    pub booked_at: Option<DateTime<Utc>>,
}

/// Create a new event.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/events \
///   -H "Content-Type: application/json" \
///   -d '{
///     "title": "Office hours",
///     "start_time": "2025-06-01T09:00:00Z",
///     "end_time": "2025-06-01T11:00:00Z",
///     "organizer": "organizer@example.com",
///     "slots": ["9am", "10am"],
///     "max_bookings": 3
///   }'
/// ```
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<NewEvent>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state.service.create_event(request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// List events ordered by id.
///
/// ```bash
/// curl "http://localhost:8080/events?offset=0&limit=10"
/// ```
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = state.service.list_events(params.page(DEFAULT_LIMIT)).await?;
    Ok(Json(events))
}

/// Get event details by ID.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, AppError> {
    let id = EventId::new(id);
    state
        .service
        .get_event(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Event", id))
}

/// Replace an event.
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<NewEvent>,
) -> Result<Json<Event>, AppError> {
    let id = EventId::new(id);
    state
        .service
        .update_event(id, request)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Event", id))
}

/// Delete an event. Its bookings go with it.
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, AppError> {
    let id = EventId::new(id);
    state
        .service
        .delete_event(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Event", id))
}

/// Capacity, booked count and remaining seats for each slot.
///
/// ```bash
/// curl http://localhost:8080/events/1/availability
/// # [{"slot":"9am","capacity":3,"booked":1,"remaining":2}]
/// ```
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<SlotAvailability>>, AppError> {
    let id = EventId::new(id);
    state
        .service
        .slot_availability(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Event", id))
}

/// List the bookings of one event.
pub async fn list_event_bookings(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let id = EventId::new(id);
    state
        .service
        .list_bookings_for_event(id, params.page(DEFAULT_LIMIT))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Event", id))
}

/// Book a slot of the event in the path.
///
/// Goes through admission; a rejection maps to its own status and code.
///
/// ```bash
/// curl -X POST http://localhost:8080/events/1/bookings \
///   -H "Content-Type: application/json" \
///   -d '{"slot":"9am","attendee_name":"Ada","attendee_email":"ada@example.com"}'
/// ```
pub async fn create_event_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<CreateEventBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state
        .service
        .request_booking(BookingDraft {
            event_id: EventId::new(id),
            slot: request.slot,
            attendee_name: request.attendee_name,
            attendee_email: request.attendee_email,
            booked_at: request.booked_at,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}
