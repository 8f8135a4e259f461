//! `PostgreSQL` event store.

use crate::error::query_error;
use chrono::{DateTime, Utc};
use slot_booking_core::{Event, EventId, EventStore, NewEvent, Page, StoreError, StoreFuture};
use sqlx::PgPool;

const EVENT_COLUMNS: &str =
    "id, title, description, start_time, end_time, organizer, slots, max_bookings";

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    title: String,
    description: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    organizer: String,
    slots: Vec<String>,
    max_bookings: i32,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let max_bookings = u32::try_from(row.max_bookings).map_err(|_| {
            StoreError::Decode(format!(
                "event {} has negative max_bookings {}",
                row.id, row.max_bookings
            ))
        })?;
        Ok(Self {
            id: EventId::new(row.id),
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            end_time: row.end_time,
            organizer: row.organizer,
            slots: row.slots,
            max_bookings,
        })
    }
}

fn capacity(event: &NewEvent) -> Result<i32, StoreError> {
    i32::try_from(event.max_bookings).map_err(|_| {
        StoreError::Database(format!(
            "max_bookings {} exceeds i32::MAX",
            event.max_bookings
        ))
    })
}

/// `PostgreSQL` implementation of [`EventStore`].
///
/// Deleting an event removes its bookings through `ON DELETE CASCADE`.
#[derive(Clone, Debug)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventStore for PostgresEventStore {
    fn create(&self, event: NewEvent) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let max_bookings = capacity(&event)?;
            let row: EventRow = sqlx::query_as(&format!(
                "INSERT INTO events (title, description, start_time, end_time, organizer, slots, max_bookings)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {EVENT_COLUMNS}"
            ))
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(&event.organizer)
            .bind(&event.slots)
            .bind(max_bookings)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error("Failed to create event"))?;

            let event = Event::try_from(row)?;
            tracing::debug!(event_id = %event.id, "Inserted event");
            Ok(event)
        })
    }

    fn get(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let row: Option<EventRow> =
                sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                    .bind(id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(query_error("Failed to get event"))?;
            row.map(Event::try_from).transpose()
        })
    }

    fn list(&self, page: Page) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let rows: Vec<EventRow> = sqlx::query_as(&format!(
                "SELECT {EVENT_COLUMNS} FROM events ORDER BY id LIMIT $1 OFFSET $2"
            ))
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list events"))?;
            rows.into_iter().map(Event::try_from).collect()
        })
    }

    fn update(&self, id: EventId, event: NewEvent) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let max_bookings = capacity(&event)?;
            let row: Option<EventRow> = sqlx::query_as(&format!(
                "UPDATE events
                 SET title = $2, description = $3, start_time = $4, end_time = $5,
                     organizer = $6, slots = $7, max_bookings = $8
                 WHERE id = $1
                 RETURNING {EVENT_COLUMNS}"
            ))
            .bind(id.get())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(&event.organizer)
            .bind(&event.slots)
            .bind(max_bookings)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("Failed to update event"))?;
            row.map(Event::try_from).transpose()
        })
    }

    fn delete(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let row: Option<EventRow> = sqlx::query_as(&format!(
                "DELETE FROM events WHERE id = $1 RETURNING {EVENT_COLUMNS}"
            ))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("Failed to delete event"))?;
            row.map(Event::try_from).transpose()
        })
    }
}
