//! Booking API endpoints.
//!
//! - POST /bookings - Request a slot
//! - GET /bookings - List bookings with pagination
//! - GET /bookings/:id - Get booking details
//! - PUT /bookings/:id - Replace a booking (administrative)
//! - DELETE /bookings/:id - Cancel a booking
//! - GET /users/:email/bookings - Bookings of one attendee

use super::{DEFAULT_ATTENDEE_LIMIT, DEFAULT_LIMIT, PageParams};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use slot_booking_core::{Booking, BookingId, EventId, NewBooking};
use slot_booking_runtime::BookingDraft;

/// Request to book a slot.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Event to book
    pub event_id: EventId,
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

impl From<CreateBookingRequest> for BookingDraft {
    fn from(request: CreateBookingRequest) -> Self {
        Self {
            event_id: request.event_id,
            slot: request.slot,
            attendee_name: request.attendee_name,
            attendee_email: request.attendee_email,
            booked_at: request.booked_at,
        }
    }
}

/// Request a slot.
///
/// Returns 201 with the booking on admission. Rejections map to
/// `EVENT_NOT_FOUND` (404), `INVALID_SLOT` (422), `DUPLICATE_BOOKING` (409)
/// and `SLOT_FULL` (409).
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.service.request_booking(request.into()).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// List bookings ordered by id.
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.service.list_bookings(params.page(DEFAULT_LIMIT)).await?;
    Ok(Json(bookings))
}

/// Get booking details by ID.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    let id = BookingId::new(id);
    state
        .service
        .get_booking(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Booking", id))
}

/// Replace a booking.
///
/// Administrative path: slot membership and capacity are not re-checked.
pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<NewBooking>,
) -> Result<Json<Booking>, AppError> {
    let id = BookingId::new(id);
    state
        .service
        .update_booking(id, request)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Booking", id))
}

/// Cancel a booking.
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    let id = BookingId::new(id);
    state
        .service
        .delete_booking(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Booking", id))
}

/// List one attendee's bookings across all events.
///
/// ```bash
/// curl "http://localhost:8080/users/ada@example.com/bookings?limit=20"
/// ```
pub async fn list_attendee_bookings(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state
        .service
        .list_bookings_for_attendee(&email, params.page(DEFAULT_ATTENDEE_LIMIT))
        .await?;
    Ok(Json(bookings))
}
