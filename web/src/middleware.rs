//! Axum middleware for request tracking.
//!
//! The correlation-id middleware:
//! 1. reads `X-Correlation-ID` from the request, or generates a UUID when it
//!    is missing or malformed
//! 2. stores it in request extensions as [`CorrelationId`]
//! 3. runs the request inside a span carrying the id
//! 4. echoes the id in the response `X-Correlation-ID` header
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn};
//! use slot_booking_web::middleware::correlation_id;
//!
//! let app = Router::new()
//!     .route("/events", get(list_events))
//!     .layer(from_fn(correlation_id));
//! ```

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::fmt;
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Correlation id of the current request, available to handlers via
/// `Extension<CorrelationId>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Correlation-id middleware, for use with `axum::middleware::from_fn`.
pub async fn correlation_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .map_or_else(|| CorrelationId(Uuid::new_v4()), CorrelationId);

    req.extensions_mut().insert(id);

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %id,
        method = %req.method(),
        uri = %req.uri(),
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(header_value) = HeaderValue::from_str(&id.to_string()) {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, header_value);
    }
    response
}
