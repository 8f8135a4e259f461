//! HTTP API integration tests.
//!
//! Drives the full router over the in-memory stores with a fixed clock:
//! routing, status codes, rejection codes and pagination.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Integration tests can use expect for setup

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use slot_booking_core::{Booking, Event, SlotAvailability};
use slot_booking_runtime::{BookingService, RetryPolicy};
use slot_booking_testing::{InMemoryStore, fixtures, test_clock};
use slot_booking_web::{AppState, CORRELATION_ID_HEADER, router};
use std::sync::Arc;
use std::time::Duration;

fn service(store: &InMemoryStore) -> BookingService {
    let store = Arc::new(store.clone());
    BookingService::new(store.clone(), store, Arc::new(test_clock())).with_retry_policy(
        RetryPolicy::builder()
            .max_retries(1)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(2))
            .build(),
    )
}

fn server_with(store: &InMemoryStore) -> TestServer {
    TestServer::new(router(AppState::new(service(store)))).expect("Failed to build test server")
}

fn server() -> TestServer {
    server_with(&InMemoryStore::new())
}

async fn create_event(server: &TestServer, slots: &[&str], capacity: u32) -> Event {
    let response = server
        .post("/events")
        .json(&fixtures::new_event(slots, capacity))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Event>()
}

fn booking_body(event: &Event, slot: &str, email: &str) -> Value {
    json!({
        "event_id": event.id,
        "slot": slot,
        "attendee_name": "Ada Lovelace",
        "attendee_email": email,
    })
}

#[tokio::test]
async fn test_health_and_readiness() {
    let server = server();

    let health = server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["status"], "ok");

    let ready = server.get("/ready").await;
    ready.assert_status_ok();
    assert_eq!(ready.json::<Value>()["ready"], true);
}

#[tokio::test]
async fn test_booking_scenario_status_codes() {
    let server = server();
    let event = create_event(&server, &["9am", "10am"], 1).await;

    let first = server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "a@example.com"))
        .await;
    first.assert_status(StatusCode::CREATED);
    let booking = first.json::<Booking>();
    assert_eq!(booking.event_id, event.id);
    assert_eq!(booking.slot, "9am");
    assert_eq!(booking.booked_at, test_clock_now());

    let full = server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "b@example.com"))
        .await;
    full.assert_status(StatusCode::CONFLICT);
    assert_eq!(full.json::<Value>()["code"], "SLOT_FULL");

    let duplicate = server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "a@example.com"))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
    assert_eq!(duplicate.json::<Value>()["code"], "DUPLICATE_BOOKING");

    let other_slot = server
        .post("/bookings")
        .json(&booking_body(&event, "10am", "a@example.com"))
        .await;
    other_slot.assert_status(StatusCode::CREATED);

    let invalid = server
        .post("/bookings")
        .json(&booking_body(&event, "11am", "a@example.com"))
        .await;
    invalid.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(invalid.json::<Value>()["code"], "INVALID_SLOT");
}

fn test_clock_now() -> chrono::DateTime<chrono::Utc> {
    use slot_booking_core::environment::Clock;
    test_clock().now()
}

#[tokio::test]
async fn test_unknown_event_booking_is_404() {
    let server = server();

    let response = server
        .post("/events/999/bookings")
        .json(&json!({
            "slot": "9am",
            "attendee_name": "Ada",
            "attendee_email": "ada@example.com",
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "EVENT_NOT_FOUND");
    assert_eq!(body["message"], "Event not found.");
}

#[tokio::test]
async fn test_event_booking_path_id_is_authoritative() {
    let server = server();
    let event = create_event(&server, &["9am"], 2).await;
    let booked_at = "2025-03-01T12:00:00Z";

    let response = server
        .post(&format!("/events/{}/bookings", event.id))
        .json(&json!({
            "event_id": 12345,
            "slot": "9am",
            "attendee_name": "Ada",
            "attendee_email": "ada@example.com",
            "booked_at": booked_at,
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let booking = response.json::<Booking>();
    assert_eq!(booking.event_id, event.id);
    assert_eq!(booking.booked_at.to_rfc3339(), "2025-03-01T12:00:00+00:00");
}

#[tokio::test]
async fn test_validation_errors_are_422() {
    let server = server();
    let event = create_event(&server, &["9am"], 2).await;

    let bad_email = server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "not-an-email"))
        .await;
    bad_email.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(bad_email.json::<Value>()["code"], "VALIDATION_ERROR");

    let mut blank_title = fixtures::new_event(&["9am"], 2);
    blank_title.title = "   ".to_string();
    let response = server.post("/events").json(&blank_title).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");

    let mut inverted = fixtures::new_event(&["9am"], 2);
    inverted.end_time = inverted.start_time;
    server
        .post("/events")
        .json(&inverted)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_event_crud_over_http() {
    let server = server();
    let event = create_event(&server, &["9am"], 2).await;
    let path = format!("/events/{}", event.id);

    let fetched = server.get(&path).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Event>(), event);

    let mut replacement = fixtures::new_event(&["9am", "10am"], 5);
    replacement.title = "Renamed".to_string();
    let updated = server.put(&path).json(&replacement).await;
    updated.assert_status_ok();
    let updated = updated.json::<Event>();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.max_bookings, 5);

    server.delete(&path).await.assert_status_ok();
    let missing = server.get(&path).await;
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(missing.json::<Value>()["code"], "NOT_FOUND");

    server
        .put(&path)
        .json(&replacement)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_crud_over_http() {
    let server = server();
    let event = create_event(&server, &["9am", "10am"], 2).await;
    let booking = server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "ada@example.com"))
        .await
        .json::<Booking>();
    let path = format!("/bookings/{}", booking.id);

    assert_eq!(server.get(&path).await.json::<Booking>(), booking);

    let moved = server
        .put(&path)
        .json(&json!({
            "event_id": event.id,
            "attendee_name": "Ada King",
            "attendee_email": "ada@example.com",
            "slot": "10am",
            "booked_at": booking.booked_at,
        }))
        .await;
    moved.assert_status_ok();
    let moved = moved.json::<Booking>();
    assert_eq!(moved.slot, "10am");
    assert_eq!(moved.attendee_name, "Ada King");

    server.delete(&path).await.assert_status_ok();
    server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancellation_frees_the_seat() {
    let server = server();
    let event = create_event(&server, &["9am"], 1).await;

    let booking = server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "a@example.com"))
        .await
        .json::<Booking>();
    server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "b@example.com"))
        .await
        .assert_status(StatusCode::CONFLICT);

    server
        .delete(&format!("/bookings/{}", booking.id))
        .await
        .assert_status_ok();

    server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "b@example.com"))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_availability_reports_remaining_seats() {
    let server = server();
    let event = create_event(&server, &["9am", "10am"], 2).await;
    server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "a@example.com"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .get(&format!("/events/{}/availability", event.id))
        .await;
    response.assert_status_ok();
    let availability = response.json::<Vec<SlotAvailability>>();

    assert_eq!(availability.len(), 2);
    assert_eq!(availability[0].slot, "9am");
    assert_eq!(availability[0].booked, 1);
    assert_eq!(availability[0].remaining, 1);
    assert_eq!(availability[1].remaining, 2);

    server
        .get("/events/999/availability")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listings_are_paginated() {
    let server = server();
    for _ in 0..12 {
        create_event(&server, &["9am"], 1).await;
    }

    let default_page = server.get("/events").await.json::<Vec<Event>>();
    assert_eq!(default_page.len(), 10);

    let second = server
        .get("/events")
        .add_query_param("offset", 10)
        .add_query_param("limit", 5)
        .await
        .json::<Vec<Event>>();
    assert_eq!(second.len(), 2);
    assert!(second[0].id > default_page[9].id);

    let capped = server
        .get("/events")
        .add_query_param("limit", 1000)
        .await
        .json::<Vec<Event>>();
    assert_eq!(capped.len(), 12);
}

#[tokio::test]
async fn test_event_and_attendee_booking_lookups() {
    let server = server();
    let first = create_event(&server, &["9am", "10am"], 3).await;
    let second = create_event(&server, &["9am"], 3).await;

    for (event, slot) in [(&first, "9am"), (&first, "10am"), (&second, "9am")] {
        server
            .post("/bookings")
            .json(&booking_body(event, slot, "ada@example.com"))
            .await
            .assert_status(StatusCode::CREATED);
    }
    server
        .post("/bookings")
        .json(&booking_body(&first, "9am", "bob@example.com"))
        .await
        .assert_status(StatusCode::CREATED);

    let for_event = server
        .get(&format!("/events/{}/bookings", first.id))
        .await
        .json::<Vec<Booking>>();
    assert_eq!(for_event.len(), 3);
    assert!(for_event.iter().all(|b| b.event_id == first.id));

    let for_ada = server
        .get("/users/ada@example.com/bookings")
        .await
        .json::<Vec<Booking>>();
    assert_eq!(for_ada.len(), 3);
    assert!(for_ada.iter().all(|b| b.attendee_email == "ada@example.com"));

    let limited = server
        .get("/users/ada@example.com/bookings")
        .add_query_param("limit", 1)
        .await
        .json::<Vec<Booking>>();
    assert_eq!(limited.len(), 1);

    server
        .get("/events/999/bookings")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let all = server.get("/bookings").await.json::<Vec<Booking>>();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_busy_store_is_503() {
    let store = InMemoryStore::new();
    let server = server_with(&store);
    let event = create_event(&server, &["9am"], 1).await;

    store.inject_conflicts(10);
    let response = server
        .post("/bookings")
        .json(&booking_body(&event, "9am", "a@example.com"))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["code"], "STORE_BUSY");
    assert!(store.all_bookings().unwrap().is_empty());
}

#[tokio::test]
async fn test_responses_carry_correlation_id() {
    let server = server();

    let response = server.get("/health").await;
    let id = response.header(CORRELATION_ID_HEADER);

    assert!(uuid_like(id.to_str().unwrap()));
}

fn uuid_like(value: &str) -> bool {
    value.len() == 36 && value.chars().filter(|c| *c == '-').count() == 4
}
