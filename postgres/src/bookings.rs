//! `PostgreSQL` booking store and per-slot transaction scopes.
//!
//! # Serialization
//!
//! [`open_slot`](BookingStore::open_slot) begins a transaction and takes a
//! transaction-scoped advisory lock on a hash of `event_id:slot`. Every
//! admission for that key queues on the same lock, so the occupancy read, the
//! insert and the commit happen with no other writer for the key in between.
//! The lock is released on commit or when the transaction is rolled back,
//! which also happens when the scope is dropped.
//!
//! Waiting for the lock is bounded by `lock_timeout`; a timeout surfaces as
//! SQLSTATE `55P03` and is reported as [`StoreError::Conflict`].
//!
//! The `UNIQUE (event_id, slot, attendee_email)` constraint backs up the
//! duplicate check for writes that bypass the lock (administrative updates).

use crate::error::{query_error, write_error};
use chrono::{DateTime, Utc};
use slot_booking_core::{
    Booking, BookingId, BookingStore, EventId, NewBooking, Page, SlotKey, SlotOccupancy,
    SlotScope, StoreError, StoreFuture,
};
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::Instrument;

const BOOKING_COLUMNS: &str = "id, event_id, attendee_name, attendee_email, slot, booked_at";

/// Default bound on waiting for a slot's advisory lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    event_id: i64,
    attendee_name: String,
    attendee_email: String,
    slot: String,
    booked_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Self {
            id: BookingId::new(row.id),
            event_id: EventId::new(row.event_id),
            attendee_name: row.attendee_name,
            attendee_email: row.attendee_email,
            slot: row.slot,
            booked_at: row.booked_at,
        }
    }
}

/// Advisory lock key text for a slot.
fn lock_key(key: &SlotKey) -> String {
    format!("{}:{}", key.event_id, key.slot)
}

/// `PostgreSQL` implementation of [`BookingStore`].
#[derive(Clone, Debug)]
pub struct PostgresBookingStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresBookingStore {
    /// Create a store over an existing pool with [`DEFAULT_LOCK_TIMEOUT`].
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Bound how long a scope waits for its slot's lock.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    async fn begin_scope(&self, key: SlotKey) -> Result<PostgresSlotScope, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_error("Failed to start transaction"))?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(query_error("Failed to set lock timeout"))?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(lock_key(&key))
            .execute(&mut *tx)
            .await
            .map_err(query_error("Failed to lock slot"))?;

        Ok(PostgresSlotScope { key, tx })
    }
}

impl BookingStore for PostgresBookingStore {
    fn open_slot(&self, key: SlotKey) -> StoreFuture<'_, Box<dyn SlotScope>> {
        let span = tracing::debug_span!("open_slot", slot_key = %key);
        Box::pin(
            async move {
                let scope: Box<dyn SlotScope> = Box::new(self.begin_scope(key).await?);
                Ok(scope)
            }
            .instrument(span),
        )
    }

    fn get(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let row: Option<BookingRow> =
                sqlx::query_as(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
                    .bind(id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(query_error("Failed to get booking"))?;
            Ok(row.map(Booking::from))
        })
    }

    fn list(&self, page: Page) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows: Vec<BookingRow> = sqlx::query_as(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY id LIMIT $1 OFFSET $2"
            ))
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list bookings"))?;
            Ok(rows.into_iter().map(Booking::from).collect())
        })
    }

    fn list_for_event(&self, event_id: EventId, page: Page) -> StoreFuture<'_, Vec<Booking>> {
        Box::pin(async move {
            let rows: Vec<BookingRow> = sqlx::query_as(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE event_id = $1
                 ORDER BY id LIMIT $2 OFFSET $3"
            ))
            .bind(event_id.get())
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list bookings for event"))?;
            Ok(rows.into_iter().map(Booking::from).collect())
        })
    }

    fn list_for_attendee<'a>(
        &'a self,
        email: &'a str,
        page: Page,
    ) -> StoreFuture<'a, Vec<Booking>> {
        Box::pin(async move {
            let rows: Vec<BookingRow> = sqlx::query_as(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE attendee_email = $1
                 ORDER BY id LIMIT $2 OFFSET $3"
            ))
            .bind(email)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await
            .map_err(query_error("Failed to list bookings for attendee"))?;
            Ok(rows.into_iter().map(Booking::from).collect())
        })
    }

    fn count<'a>(&'a self, key: &'a SlotKey) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let booked: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE event_id = $1 AND slot = $2")
                    .bind(key.event_id.get())
                    .bind(&key.slot)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(query_error("Failed to count bookings"))?;
            Ok(u64::try_from(booked).unwrap_or_default())
        })
    }

    fn find<'a>(
        &'a self,
        key: &'a SlotKey,
        attendee_email: &'a str,
    ) -> StoreFuture<'a, Option<Booking>> {
        Box::pin(async move {
            let row: Option<BookingRow> = sqlx::query_as(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE event_id = $1 AND slot = $2 AND attendee_email = $3"
            ))
            .bind(key.event_id.get())
            .bind(&key.slot)
            .bind(attendee_email)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("Failed to find booking"))?;
            Ok(row.map(Booking::from))
        })
    }

    fn update(&self, id: BookingId, booking: NewBooking) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let row: Option<BookingRow> = sqlx::query_as(&format!(
                "UPDATE bookings
                 SET event_id = $2, attendee_name = $3, attendee_email = $4, slot = $5, booked_at = $6
                 WHERE id = $1
                 RETURNING {BOOKING_COLUMNS}"
            ))
            .bind(id.get())
            .bind(booking.event_id.get())
            .bind(&booking.attendee_name)
            .bind(&booking.attendee_email)
            .bind(&booking.slot)
            .bind(booking.booked_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(write_error("Failed to update booking", booking.event_id))?;
            Ok(row.map(Booking::from))
        })
    }

    fn delete(&self, id: BookingId) -> StoreFuture<'_, Option<Booking>> {
        Box::pin(async move {
            let row: Option<BookingRow> = sqlx::query_as(&format!(
                "DELETE FROM bookings WHERE id = $1 RETURNING {BOOKING_COLUMNS}"
            ))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error("Failed to delete booking"))?;
            Ok(row.map(Booking::from))
        })
    }
}

/// An open transaction holding one slot's advisory lock.
///
/// Dropping it without [`commit`](SlotScope::commit) rolls the transaction back.
struct PostgresSlotScope {
    key: SlotKey,
    tx: Transaction<'static, Postgres>,
}

impl SlotScope for PostgresSlotScope {
    fn key(&self) -> &SlotKey {
        &self.key
    }

    fn occupancy<'a>(&'a mut self, attendee_email: &'a str) -> StoreFuture<'a, SlotOccupancy> {
        Box::pin(async move {
            let booked: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE event_id = $1 AND slot = $2")
                    .bind(self.key.event_id.get())
                    .bind(&self.key.slot)
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(query_error("Failed to count bookings"))?;

            let existing: Option<BookingRow> = sqlx::query_as(&format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE event_id = $1 AND slot = $2 AND attendee_email = $3"
            ))
            .bind(self.key.event_id.get())
            .bind(&self.key.slot)
            .bind(attendee_email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(query_error("Failed to find booking"))?;

            Ok(SlotOccupancy {
                booked: u64::try_from(booked).unwrap_or_default(),
                existing: existing.map(Booking::from),
            })
        })
    }

    fn insert(&mut self, booking: NewBooking) -> StoreFuture<'_, Booking> {
        Box::pin(async move {
            if booking.slot_key() != self.key {
                return Err(StoreError::Database(format!(
                    "booking for {} inserted through scope for {}",
                    booking.slot_key(),
                    self.key
                )));
            }
            let row: BookingRow = sqlx::query_as(&format!(
                "INSERT INTO bookings (event_id, attendee_name, attendee_email, slot, booked_at)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING {BOOKING_COLUMNS}"
            ))
            .bind(booking.event_id.get())
            .bind(&booking.attendee_name)
            .bind(&booking.attendee_email)
            .bind(&booking.slot)
            .bind(booking.booked_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(write_error("Failed to insert booking", booking.event_id))?;
            Ok(Booking::from(row))
        })
    }

    fn commit(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>> {
        let span = tracing::debug_span!("commit_slot", slot_key = %self.key);
        Box::pin(
            async move {
                let scope = *self;
                let event_id = scope.key.event_id;
                scope
                    .tx
                    .commit()
                    .await
                    .map_err(write_error("Failed to commit booking", event_id))
            }
            .instrument(span),
        )
    }
}
