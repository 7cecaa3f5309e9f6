//! Utility functions for hashing and serialization

use super::types::Booking;
use uuid7::uuid7;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// time-ordered id attached to every outgoing request
pub fn new_request_id() -> String {
    uuid7().to_string()
}

/// Content digest of a booking list, used to tell whether a refresh changed anything.
pub fn snapshot_digest(bookings: &[Booking]) -> anyhow::Result<String> {
    let contents = minicbor::to_vec(bookings)?;
    Ok(sha256::digest(&contents))
}
