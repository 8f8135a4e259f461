//! Input validation applied before requests reach the stores or the
//! admission engine.
//!
//! These are format checks only. Whether a slot exists, is full, or is
//! already held is decided by the admission engine.

use crate::admission::BookingRequest;
use crate::types::{NewBooking, NewEvent};
use std::collections::HashSet;
use thiserror::Error;

/// A malformed field in an otherwise well-shaped request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the offending field
    pub field: &'static str,
    /// What is wrong with it
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate the organizer-supplied fields of an event.
///
/// # Errors
///
/// Returns the first failing field:
/// - `title` is blank
/// - `end_time` is not after `start_time`
/// - `max_bookings` is zero
/// - a slot label is blank or repeated
pub fn validate_event(event: &NewEvent) -> Result<(), ValidationError> {
    if event.title.trim().is_empty() {
        return Err(ValidationError::new("title", "Title cannot be empty"));
    }
    if event.end_time <= event.start_time {
        return Err(ValidationError::new(
            "end_time",
            "End time must be after start time",
        ));
    }
    if event.max_bookings == 0 {
        return Err(ValidationError::new(
            "max_bookings",
            "Capacity must be at least one booking per slot",
        ));
    }

    let mut seen = HashSet::with_capacity(event.slots.len());
    for slot in &event.slots {
        if slot.trim().is_empty() {
            return Err(ValidationError::new("slots", "Slot labels cannot be empty"));
        }
        if !seen.insert(slot.as_str()) {
            return Err(ValidationError::new(
                "slots",
                format!("Duplicate slot label '{slot}'"),
            ));
        }
    }
    Ok(())
}

/// Validate the attendee-supplied fields of a booking request.
///
/// # Errors
///
/// - `attendee_name` is blank
/// - `attendee_email` is not a well-formed address
pub fn validate_booking_request(request: &BookingRequest) -> Result<(), ValidationError> {
    validate_attendee(&request.attendee_name, &request.attendee_email)
}

/// Validate a full booking replacement on the administrative path.
///
/// # Errors
///
/// Same as [`validate_booking_request`].
pub fn validate_booking(booking: &NewBooking) -> Result<(), ValidationError> {
    validate_attendee(&booking.attendee_name, &booking.attendee_email)
}

fn validate_attendee(name: &str, email: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new(
            "attendee_name",
            "Attendee name cannot be empty",
        ));
    }
    if !is_valid_email(email) {
        return Err(ValidationError::new(
            "attendee_email",
            "value is not a valid email address",
        ));
    }
    Ok(())
}

/// Basic email shape check.
///
/// - exactly one `@` with non-empty local and domain parts
/// - the domain has at least one dot and no empty labels
/// - 3 to 255 characters, no whitespace
///
/// # Examples
///
/// ```
/// use slot_booking_core::validation::is_valid_email;
///
/// assert!(is_valid_email("user@example.com"));
/// assert!(is_valid_email("first.last+tag@mail.example.org"));
/// assert!(!is_valid_email("user@localhost"));
/// assert!(!is_valid_email("@example.com"));
/// ```
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let local_ok = local
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_' | '\''));
    let domain_ok = domain
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-'));
    if !local_ok || !domain_ok {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::EventId;
    use chrono::{Duration, Utc};

    fn event() -> NewEvent {
        let start = Utc::now();
        NewEvent {
            title: "Mentoring".to_string(),
            description: Some("One-on-one".to_string()),
            start_time: start,
            end_time: start + Duration::hours(2),
            organizer: "mentor@example.com".to_string(),
            slots: vec!["9am".to_string(), "10am".to_string()],
            max_bookings: 1,
        }
    }

    fn request(name: &str, email: &str) -> BookingRequest {
        BookingRequest {
            event_id: EventId::new(1),
            slot: "9am".to_string(),
            attendee_name: name.to_string(),
            attendee_email: email.to_string(),
            booked_at: Utc::now(),
        }
    }

    #[test]
    fn accepts_well_formed_event() {
        assert_eq!(validate_event(&event()), Ok(()));
    }

    #[test]
    fn accepts_event_without_slots() {
        let new = NewEvent {
            slots: vec![],
            ..event()
        };
        assert_eq!(validate_event(&new), Ok(()));
    }

    #[test]
    fn rejects_blank_title() {
        let new = NewEvent {
            title: "   ".to_string(),
            ..event()
        };
        assert_eq!(validate_event(&new).map_err(|e| e.field), Err("title"));
    }

    #[test]
    fn rejects_end_before_or_at_start() {
        let base = event();
        let same = NewEvent {
            end_time: base.start_time,
            ..base.clone()
        };
        assert_eq!(validate_event(&same).map_err(|e| e.field), Err("end_time"));

        let earlier = NewEvent {
            end_time: base.start_time - Duration::minutes(1),
            ..base
        };
        assert_eq!(validate_event(&earlier).map_err(|e| e.field), Err("end_time"));
    }

    #[test]
    fn rejects_zero_capacity() {
        let new = NewEvent {
            max_bookings: 0,
            ..event()
        };
        assert_eq!(validate_event(&new).map_err(|e| e.field), Err("max_bookings"));
    }

    #[test]
    fn rejects_repeated_slot_label() {
        let new = NewEvent {
            slots: vec!["9am".to_string(), "9am".to_string()],
            ..event()
        };
        let err = validate_event(&new).unwrap_err();
        assert_eq!(err.field, "slots");
        assert!(err.message.contains("9am"));
    }

    #[test]
    fn booking_requires_name_and_email() {
        assert_eq!(validate_booking_request(&request("Ada", "ada@example.com")), Ok(()));
        assert_eq!(
            validate_booking_request(&request("", "ada@example.com")).map_err(|e| e.field),
            Err("attendee_name")
        );
        assert_eq!(
            validate_booking_request(&request("Ada", "not-an-email")).map_err(|e| e.field),
            Err("attendee_email")
        );
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("o'brien@example.ie"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
        assert!(!is_valid_email("user@example..com"));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email("user@"));
    }
}
