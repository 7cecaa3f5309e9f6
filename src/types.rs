//! Core booking, room and user types
use super::conflict::Slot;
use super::error::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const MAX_TITLE_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    Hash,
    PartialEq,
)]
pub enum Priority {
    #[n(0)]
    Low,
    #[n(1)]
    #[default]
    Medium,
    #[n(2)]
    High,
}

#[derive(
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    Hash,
    PartialEq,
)]
pub enum BookingStatus {
    #[n(0)]
    #[default]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Rejected,
    #[n(3)]
    Cancelled,
}

#[derive(
    Serialize, Deserialize, minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[n(0)]
    User,
    #[n(1)]
    Admin,
}

/// Wall-clock time of day, stored as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

/// UTC instant. Accepts offset-less timestamps from the backend and reads them as UTC.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp(DateTime<Utc>);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub floor: String,
    pub room_number: String,
    pub capacity: u32,
    pub image_url: String,
    pub features: Vec<String>,
}

#[derive(Serialize, Deserialize, minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Booking {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub user_id: String,
    #[n(2)]
    pub user_name: String, // denormalised for display
    #[n(3)]
    pub room_id: String,
    #[n(4)]
    pub room_name: String,
    #[n(5)]
    #[cbor(with = "date_codec")]
    pub date: NaiveDate,
    #[n(6)]
    pub start_time: ClockTime,
    #[n(7)]
    pub end_time: ClockTime,
    #[n(8)]
    pub title: String,
    #[n(9)]
    pub attendees: u32,
    #[n(10)]
    pub description: String,
    #[n(11)]
    pub priority: Priority,
    #[n(12)]
    pub status: BookingStatus,
    #[n(13)]
    pub equipment: Vec<String>,
    #[n(14)]
    pub created_at: TimeStamp,
    #[n(15)]
    pub notes: Option<String>, // rejection reason or cancellation note
}

#[derive(Serialize, Deserialize, minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct User {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub email: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub role: Role,
    #[n(4)]
    pub avatar: Option<String>,
}

// Used for constructing requests before they are sent
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BookingDraft {
    room_id: Option<String>,
    date: Option<NaiveDate>,
    start_time: Option<ClockTime>,
    end_time: Option<ClockTime>,
    title: Option<String>,
    attendees: u32,
    description: String,
    priority: Priority,
    equipment: Vec<String>,
}

/// A validated booking request. Carries no status: the backend always creates it as pending.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub room_id: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub title: String,
    pub attendees: u32,
    pub description: String,
    pub priority: Priority,
    pub equipment: Vec<String>,
}

/// Partial content update. Unset fields are left untouched by the backend.
#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct BookingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<ClockTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<ClockTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<String>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CleanupStatus {
    pub enabled: bool,
    pub retention_days: u32,
    pub cleanup_hour: u32,
    #[serde(default = "default_true")]
    pub auto_cleanup_enabled: bool,
}

/// Deletion counts per status from a cleanup run.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct CleanupReport {
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub approved: u64,
    #[serde(default)]
    pub rejected: u64,
    #[serde(default)]
    pub cancelled: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub cutoff_date: Option<TimeStamp>,
}

fn default_true() -> bool {
    true
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(ValidationError::InvalidPriority(s.to_string())),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Approved => "Approved",
            BookingStatus::Rejected => "Rejected",
            BookingStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(ValidationError::InvalidRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("USER"),
            Role::Admin => f.write_str("ADMIN"),
        }
    }
}

impl ClockTime {
    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < Self::MINUTES_PER_DAY).then_some(Self(minutes))
    }
    pub fn minutes(&self) -> u16 {
        self.0
    }
    pub fn hour(&self) -> u32 {
        u32::from(self.0 / 60)
    }
    pub fn minute(&self) -> u32 {
        u32::from(self.0 % 60)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    /// Parses `HH:MM`, also accepting the backend's `HH:MM:SS` form (seconds are dropped).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidClockTime(s.to_string());
        // ASCII digits only, `u32::from_str` accepts a leading '+'
        let digits = |f: &str| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit());
        let mut parts = s.trim().split(':');

        let hour = parts.next().ok_or_else(invalid)?;
        let minute = parts.next().ok_or_else(invalid)?;
        if let Some(seconds) = parts.next() {
            let whole = seconds.split('.').next().unwrap_or_default();
            if !digits(whole) {
                return Err(invalid());
            }
            whole.parse::<u32>().ok().filter(|s| *s < 60).ok_or_else(invalid)?;
        }
        if parts.next().is_some() || hour.len() > 2 || minute.len() != 2 {
            return Err(invalid());
        }
        if !digits(hour) || !digits(minute) {
            return Err(invalid());
        }

        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;
        ClockTime::new(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// RFC 3339 first, then the naive ISO form Python emits for UTC columns.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl Serialize for TimeStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeStamp::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}

impl<C> minicbor::Encode<C> for ClockTime {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.u16(self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for ClockTime {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let minutes = d.u16()?;

        ClockTime::from_minutes(minutes)
            .ok_or(minicbor::decode::Error::message("clock time past midnight"))
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

// Calendar days are stored as days since 0001-01-01
mod date_codec {
    use chrono::{Datelike, NaiveDate};
    use minicbor::decode::Error as DecodeError;
    use minicbor::encode::{Error as EncodeError, Write};
    use minicbor::{Decoder, Encoder};

    pub fn encode<Ctx, W: Write>(
        v: &NaiveDate,
        e: &mut Encoder<W>,
        _: &mut Ctx,
    ) -> Result<(), EncodeError<W::Error>> {
        e.i32(v.num_days_from_ce())?.ok()
    }

    pub fn decode<Ctx>(d: &mut Decoder<'_>, _: &mut Ctx) -> Result<NaiveDate, DecodeError> {
        let days = d.i32()?;
        NaiveDate::from_num_days_from_ce_opt(days)
            .ok_or(DecodeError::message("calendar day out of range"))
    }
}

impl Booking {
    pub fn slot(&self) -> Slot<'_> {
        Slot {
            room_id: &self.room_id,
            date: self.date,
            start: self.start_time,
            end: self.end_time,
        }
    }
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
    /// Initials avatar used when the profile has none of its own.
    pub fn generated_avatar(name: &str, role: Role) -> String {
        let background = match role {
            Role::Admin => "f59e0b",
            Role::User => "6366f1",
        };
        match reqwest::Url::parse_with_params(
            "https://ui-avatars.com/api/",
            &[("name", name), ("background", background), ("color", "fff")],
        ) {
            Ok(url) => url.to_string(),
            Err(_) => String::new(),
        }
    }
}

impl BookingDraft {
    /// Construct an empty draft, priority defaults to medium
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_room(mut self, room_id: &str) -> Self {
        self.room_id = Some(room_id.to_string());
        self
    }
    pub fn set_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
    pub fn set_start_time(mut self, time: ClockTime) -> Self {
        self.start_time = Some(time);
        self
    }
    pub fn set_end_time(mut self, time: ClockTime) -> Self {
        self.end_time = Some(time);
        self
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn set_attendees(mut self, attendees: u32) -> Self {
        self.attendees = attendees;
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
    pub fn set_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
    pub fn add_equipment(mut self, item: &str) -> Self {
        self.equipment.push(item.to_string());
        self
    }
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }
    /// Checks `start < end`. Missing times never validate.
    pub fn validate_times(&self) -> bool {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => start < end,
            _ => false,
        }
    }
    // Checks every field and returns the request body on success
    pub fn validate_and_finalise(&self) -> Result<NewBooking, ValidationError> {
        let room_id = self
            .room_id
            .as_ref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ValidationError::MissingField("Room"))?;
        let date = self.date.ok_or(ValidationError::MissingField("Date"))?;
        let start_time = self
            .start_time
            .ok_or(ValidationError::MissingField("Start time"))?;
        let end_time = self
            .end_time
            .ok_or(ValidationError::MissingField("End time"))?;
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ValidationError::MissingField("Title"))?;

        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong {
                len: title.chars().count(),
                max: MAX_TITLE_LEN,
            });
        }
        if !self.validate_times() {
            return Err(ValidationError::InvalidTimeRange);
        }
        if self.attendees == 0 {
            return Err(ValidationError::NoAttendees);
        }

        Ok(NewBooking {
            room_id: room_id.clone(),
            date,
            start_time,
            end_time,
            title: title.to_string(),
            attendees: self.attendees,
            description: self.description.clone(),
            priority: self.priority,
            equipment: self.equipment.clone(),
        })
    }
}

impl NewBooking {
    pub fn slot(&self) -> Slot<'_> {
        Slot {
            room_id: &self.room_id,
            date: self.date,
            start: self.start_time,
            end: self.end_time,
        }
    }
}

impl BookingUpdate {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_room(mut self, room_id: &str) -> Self {
        self.room_id = Some(room_id.to_string());
        self
    }
    pub fn set_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
    pub fn set_start_time(mut self, time: ClockTime) -> Self {
        self.start_time = Some(time);
        self
    }
    pub fn set_end_time(mut self, time: ClockTime) -> Self {
        self.end_time = Some(time);
        self
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn set_attendees(mut self, attendees: u32) -> Self {
        self.attendees = Some(attendees);
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
    pub fn set_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
    pub fn set_equipment(mut self, equipment: Vec<String>) -> Self {
        self.equipment = Some(equipment);
        self
    }
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
    /// The time window the booking would have once this update is applied.
    pub fn merged_times(&self, current: &Booking) -> (ClockTime, ClockTime) {
        (
            self.start_time.unwrap_or(current.start_time),
            self.end_time.unwrap_or(current.end_time),
        )
    }
}

impl Registration {
    /// Self-service sign up. The role is `USER` unless changed with [`Registration::set_role`].
    pub fn new(email: &str, name: &str, password: &str) -> Result<Self, ValidationError> {
        let email = email.trim();
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("Name"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
        }

        Ok(Self {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
            role: Role::User,
        })
    }
    /// Accounts created by an admin may carry any role.
    pub fn set_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}
