pub mod activity;
pub mod config;
pub mod conflict;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod retention;
pub mod service;
pub mod session;
pub mod types;
pub mod utils;

pub use conflict::{Slot, find_conflict};
pub use error::{ClientError, LifecycleError, ServiceError, SessionError, ValidationError};
pub use http::{BookingBackend, HttpBackend};
pub use service::{BookingService, SyncOutcome};
pub use types::{Booking, BookingDraft, BookingStatus, ClockTime, Priority, Role, Room, User};
