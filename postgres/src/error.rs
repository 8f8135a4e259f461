//! Mapping from `sqlx` errors to [`StoreError`].
//!
//! | SQLSTATE / condition            | `StoreError`     |
//! |---------------------------------|------------------|
//! | `40001` serialization failure   | `Conflict`       |
//! | `40P01` deadlock detected       | `Conflict`       |
//! | `55P03` lock not available      | `Conflict`       |
//! | pool acquire timeout            | `Conflict`       |
//! | `23505` unique violation        | `UniqueViolation`|
//! | `23503` foreign key violation   | `EventMissing`   |
//! | column decode failure           | `Decode`         |
//! | anything else                   | `Database`       |

use slot_booking_core::{EventId, StoreError};

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Map a failed query. `event_id` is the event a booking write referred to,
/// used to report a foreign-key violation as `EventMissing`.
pub(crate) fn map_sqlx(context: &str, event_id: Option<EventId>, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut => {
            return StoreError::Conflict(format!("{context}: connection pool exhausted"));
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            return StoreError::Decode(format!("{context}: {err}"));
        }
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE) => {
                return StoreError::Conflict(format!("{context}: {db_err}"));
            }
            Some(UNIQUE_VIOLATION) => return StoreError::UniqueViolation,
            Some(FOREIGN_KEY_VIOLATION) => {
                if let Some(event_id) = event_id {
                    return StoreError::EventMissing(event_id);
                }
            }
            _ => {}
        },
        _ => {}
    }
    StoreError::Database(format!("{context}: {err}"))
}

/// Shorthand for queries that cannot violate the booking foreign key.
pub(crate) fn query_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| map_sqlx(context, None, err)
}

/// Shorthand for booking writes that reference `event_id`.
pub(crate) fn write_error(
    context: &'static str,
    event_id: EventId,
) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| map_sqlx(context, Some(event_id), err)
}
