//! Retention rule for resolved bookings
//!
//! The backend owns the schedule and the deletes. This mirrors its rule so the
//! client can preview what a run would remove before triggering one.
use super::types::{Booking, BookingStatus, CleanupReport, CleanupStatus, TimeStamp};
use chrono::{DateTime, Duration, NaiveTime, Utc};

pub const DEFAULT_RETENTION_DAYS: u32 = 10;
pub const DEFAULT_CLEANUP_HOUR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub enabled: bool,
    pub retention_days: u32,
    pub cleanup_hour: u32, // UTC
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: DEFAULT_RETENTION_DAYS,
            cleanup_hour: DEFAULT_CLEANUP_HOUR,
        }
    }
}

impl From<&CleanupStatus> for RetentionPolicy {
    fn from(status: &CleanupStatus) -> Self {
        Self {
            enabled: status.enabled,
            retention_days: status.retention_days,
            cleanup_hour: status.cleanup_hour,
        }
    }
}

impl RetentionPolicy {
    /// Bookings created strictly before this instant are old enough to purge.
    ///
    /// A window reaching past the earliest representable instant saturates
    /// there, so nothing is old enough.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_days(i64::from(self.retention_days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Pending bookings are kept regardless of age.
    pub fn is_purgeable(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        self.enabled
            && booking.status != BookingStatus::Pending
            && booking.created_at.to_datetime_utc() < self.cutoff(now)
    }

    /// The report a run at `now` would produce against `bookings`.
    pub fn preview(&self, bookings: &[Booking], now: DateTime<Utc>) -> CleanupReport {
        if !self.enabled {
            return CleanupReport {
                skipped: true,
                ..CleanupReport::default()
            };
        }

        let mut report = CleanupReport {
            cutoff_date: Some(TimeStamp::from(self.cutoff(now))),
            ..CleanupReport::default()
        };
        for booking in bookings.iter().filter(|b| self.is_purgeable(b, now)) {
            match booking.status {
                BookingStatus::Approved => report.approved += 1,
                BookingStatus::Rejected => report.rejected += 1,
                BookingStatus::Cancelled => report.cancelled += 1,
                BookingStatus::Pending => {}
            }
        }
        report.total = report.approved + report.rejected + report.cancelled;

        report
    }

    /// Bookings that survive a run at `now`.
    pub fn retained<'b>(&self, bookings: &'b [Booking], now: DateTime<Utc>) -> Vec<&'b Booking> {
        bookings
            .iter()
            .filter(|b| !self.is_purgeable(b, now))
            .collect()
    }

    /// Next daily run strictly after `now`, at `cleanup_hour:00` UTC.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let at = NaiveTime::from_hms_opt(self.cleanup_hour % 24, 0, 0).unwrap_or_default();
        let today = now.date_naive().and_time(at).and_utc();

        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}
