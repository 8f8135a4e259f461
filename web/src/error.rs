//! Error types for web handlers.
//!
//! This module bridges service errors and admission rejections to HTTP
//! responses, implementing Axum's `IntoResponse` trait.
//!
//! | Outcome                      | Status | Code                  |
//! |------------------------------|--------|-----------------------|
//! | missing record               | 404    | `NOT_FOUND`           |
//! | validation failure           | 422    | `VALIDATION_ERROR`    |
//! | `Rejection::EventNotFound`   | 404    | `EVENT_NOT_FOUND`     |
//! | `Rejection::InvalidSlot`     | 422    | `INVALID_SLOT`        |
//! | `Rejection::DuplicateBooking`| 409    | `DUPLICATE_BOOKING`   |
//! | `Rejection::SlotFull`        | 409    | `SLOT_FULL`           |
//! | store contention             | 503    | `STORE_BUSY`          |
//! | store failure                | 500    | `INTERNAL_SERVER_ERROR` |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use slot_booking_core::{AdmissionError, Rejection};
use slot_booking_runtime::ServiceError;
use std::fmt;

/// Application error type for web handlers.
///
/// Carries the HTTP status, a stable machine-readable code and a user-facing
/// message. Internal causes are kept for logging and never serialized.
///
/// # Examples
///
/// ```ignore
/// async fn handler(Path(id): Path<EventId>) -> Result<Json<Event>, AppError> {
///     let event = state.service.get_event(id).await?
///         .ok_or_else(|| AppError::not_found("Event", id))?;
///     Ok(Json(event))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Map an admission rejection to its status and code.
    #[must_use]
    pub fn rejected(reason: Rejection) -> Self {
        let status = match reason {
            Rejection::EventNotFound => StatusCode::NOT_FOUND,
            Rejection::InvalidSlot => StatusCode::UNPROCESSABLE_ENTITY,
            Rejection::DuplicateBooking | Rejection::SlotFull => StatusCode::CONFLICT,
        };
        Self::new(status, reason.message().to_string(), reason.code().to_string())
    }

    /// Create a 503 error for a store that stayed busy through every retry.
    #[must_use]
    pub fn store_busy() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "The booking store is busy, please retry".to_string(),
            "STORE_BUSY".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let source = self.source.as_ref().map(ToString::to_string);
        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!(
                status = %self.status,
                code = %self.code,
                error = source.as_deref().unwrap_or_default(),
                "Service unavailable"
            );
        } else if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                error = source.as_deref().unwrap_or_default(),
                "Internal server error"
            );
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => Self::validation(e.to_string()),
            ServiceError::Rejected(reason) => Self::rejected(reason),
            ServiceError::Admission(e @ AdmissionError::Transient { .. }) => {
                Self::store_busy().with_source(e.into())
            }
            ServiceError::Admission(AdmissionError::Store(e)) | ServiceError::Store(e) => {
                Self::internal("An internal error occurred").with_source(e.into())
            }
        }
    }
}
