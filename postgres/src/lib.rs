//! `PostgreSQL` stores for slot booking.
//!
//! This crate implements the `EventStore` and `BookingStore` traits from
//! `slot-booking-core` on top of sqlx:
//!
//! - Events and bookings in two tables, bookings cascading on event delete
//! - Per-slot admission scopes: a transaction holding an advisory lock on the
//!   `(event_id, slot)` key
//! - A unique index on `(event_id, slot, attendee_email)`
//! - SQLSTATE mapping from contention to retryable `StoreError::Conflict`
//! - Embedded migrations
//!
//! # Example
//!
//! ```ignore
//! use slot_booking_postgres::{PostgresBookingStore, PostgresEventStore, migrate};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::PgPool::connect("postgres://localhost/slot_booking").await?;
//!     migrate(&pool).await?;
//!     let events = PostgresEventStore::new(pool.clone());
//!     let bookings = PostgresBookingStore::new(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bookings;
mod error;
mod events;

pub use bookings::{DEFAULT_LOCK_TIMEOUT, PostgresBookingStore};
pub use events::PostgresEventStore;

use slot_booking_core::StoreError;
use sqlx::PgPool;
use sqlx::migrate::Migrator;

/// Schema migrations, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run pending migrations.
///
/// # Errors
///
/// Returns `Database` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
