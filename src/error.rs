use crate::types::BookingStatus;

/// Failures raised while checking a booking request before it is sent.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is not set")]
    MissingField(&'static str),
    #[error("End time must be after start time")]
    InvalidTimeRange,
    #[error("Attendee count must be greater than zero")]
    NoAttendees,
    #[error("Title must be at most {max} characters, got {len}")]
    TitleTooLong { len: usize, max: usize },
    #[error("'{0}' is not a valid HH:MM time")]
    InvalidClockTime(String),
    #[error("'{0}' is not a valid priority")]
    InvalidPriority(String),
    #[error("'{0}' is not a valid role, expected USER or ADMIN")]
    InvalidRole(String),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
}

/// Illegal status transitions and permission failures in the booking workflow.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Only administrators may {0}")]
    AdminRequired(&'static str),
    #[error("Booking {0} belongs to another user")]
    NotOwner(String),
    #[error("Cannot move booking from {from} to {to}")]
    IllegalTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("A rejection requires a non-empty reason")]
    MissingReason,
    #[error("Only pending bookings can be edited, this one is {0}")]
    NotEditable(BookingStatus),
    #[error("End time must be after start time")]
    InvalidTimeRange,
}

/// Errors returned by the booking backend transport.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Authentication required")]
    Unauthorized,
    #[error("Permission denied: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rejected by backend: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Backend error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Failures reading or writing the persisted session.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Session storage failed: {0}")]
    Storage(#[from] sled::Error),
    #[error("Failed to encode session: {0}")]
    Encode(String),
    #[error("Failed to decode session: {0}")]
    Decode(#[from] minicbor::decode::Error),
}

/// Everything a [`crate::service::BookingService`] operation can fail with.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("No active session, log in first")]
    NotAuthenticated,
    #[error("Session expired, log in again")]
    SessionExpired,
    #[error("Invalid email or password")]
    AuthenticationFailed,
    #[error("Booking {0} is not in the local cache")]
    UnknownBooking(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
