//! Advisory overlap detection between booking requests and approved bookings.
//!
//! Everything here is a pure function over bookings the caller already holds.
//! The backend runs its own check when a booking is created or approved and its
//! answer wins; these helpers only flag likely collisions ahead of time.
use super::types::{Booking, BookingStatus, ClockTime};
use chrono::NaiveDate;

/// A room, a day and a half-open `[start, end)` window on that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<'a> {
    pub room_id: &'a str,
    pub date: NaiveDate,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl<'a> Slot<'a> {
    pub fn new(room_id: &'a str, date: NaiveDate, start: ClockTime, end: ClockTime) -> Self {
        Self {
            room_id,
            date,
            start,
            end,
        }
    }

    pub fn overlaps(&self, other: &Slot<'_>) -> bool {
        self.room_id == other.room_id
            && self.date == other.date
            && overlaps(self.start, self.end, other.start, other.end)
    }
}

/// Half-open interval overlap, `[a_start, a_end)` against `[b_start, b_end)`.
/// Touching boundaries do not overlap.
pub fn overlaps(
    a_start: ClockTime,
    a_end: ClockTime,
    b_start: ClockTime,
    b_end: ClockTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// First approved booking, in the given order, whose slot overlaps `candidate`.
/// Bookings in any other status are skipped.
pub fn find_conflict<'b>(candidate: &Slot<'_>, bookings: &'b [Booking]) -> Option<&'b Booking> {
    bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Approved)
        .find(|b| b.slot().overlaps(candidate))
}

/// Every approved booking overlapping `booking`, excluding `booking` itself.
pub fn find_conflicts<'b>(booking: &Booking, bookings: &'b [Booking]) -> Vec<&'b Booking> {
    let slot = booking.slot();

    bookings
        .iter()
        .filter(|b| b.id != booking.id)
        .filter(|b| b.status == BookingStatus::Approved)
        .filter(|b| b.slot().overlaps(&slot))
        .collect()
}

/// The approved booking holding `room_id` at `time` on `date`, if any.
pub fn occupant_at<'b>(
    room_id: &str,
    date: NaiveDate,
    time: ClockTime,
    bookings: &'b [Booking],
) -> Option<&'b Booking> {
    bookings.iter().find(|b| {
        b.status == BookingStatus::Approved
            && b.room_id == room_id
            && b.date == date
            && b.start_time <= time
            && time < b.end_time
    })
}

/// Pending requests paired with the approved booking they would collide with.
///
/// Used for the admin review queue. Approving a request listed here does not
/// cancel the occupant: that has to be done explicitly.
pub fn collisions(bookings: &[Booking]) -> Vec<(&Booking, &Booking)> {
    bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Pending)
        .filter_map(|pending| {
            find_conflict(&pending.slot(), bookings).map(|occupant| (pending, occupant))
        })
        .collect()
}
