//! In-memory stand-in for the booking backend.
//!
//! It enforces the same rules as the real service (ownership, admin-only
//! transitions, conflicts on create and approve) so the client can be driven
//! end to end without a network. Every call is recorded by name.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use room_booking::conflict::{find_conflict, find_conflicts};
use room_booking::error::{ClientError, ClientResult};
use room_booking::http::BookingBackend;
use room_booking::retention::RetentionPolicy;
use room_booking::session::{Credential, SessionStore};
use room_booking::types::{
    Booking, BookingStatus, BookingUpdate, CleanupReport, CleanupStatus, ClockTime, NewBooking,
    Registration, Role, Room, TimeStamp, User,
};
use room_booking::{BookingDraft, BookingService};
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

#[derive(Default)]
pub struct FakeState {
    pub users: Vec<(User, String)>,
    pub rooms: Vec<Room>,
    pub bookings: Vec<Booking>,
    pub calls: Vec<String>,
    pub revoked: bool,
    pub cleanup: RetentionPolicy,
    next_id: u32,
}

#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
    token: Option<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let mut state = FakeState::default();
        state.users.push((user("admin-1", "Grace", Role::Admin), "admin-pass".into()));
        state.users.push((user("user-1", "Ada", Role::User), "ada-pass".into()));
        state.users.push((user("user-2", "Linus", Role::User), "linus-pass".into()));
        state.rooms.push(room("R1", "Board Room", 10));
        state.rooms.push(room("R2", "Huddle", 4));

        Self {
            state: Arc::new(Mutex::new(state)),
            token: None,
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Calls recorded so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Makes every authenticated call answer 401 from now on.
    pub fn revoke_tokens(&self) {
        self.state().revoked = true;
    }

    fn record(&self, call: &str) {
        self.state().calls.push(call.to_string());
    }

    fn caller(&self) -> ClientResult<User> {
        let state = self.state();
        if state.revoked {
            return Err(ClientError::Unauthorized);
        }
        let token = self.token.as_deref().ok_or(ClientError::Unauthorized)?;
        state
            .users
            .iter()
            .map(|(u, _)| u)
            .find(|u| format!("token-{}", u.id) == token)
            .cloned()
            .ok_or(ClientError::Unauthorized)
    }

    fn admin(&self) -> ClientResult<User> {
        let caller = self.caller()?;
        if caller.role != Role::Admin {
            return Err(ClientError::Forbidden("Admin access required".into()));
        }
        Ok(caller)
    }

    fn with_booking<F>(&self, id: &str, f: F) -> ClientResult<Booking>
    where
        F: FnOnce(&mut Booking) -> ClientResult<()>,
    {
        let mut state = self.state();
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| ClientError::NotFound("Booking not found".into()))?;
        f(booking)?;
        Ok(booking.clone())
    }
}

#[async_trait]
impl BookingBackend for FakeBackend {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn login(&self, email: &str, password: &str) -> ClientResult<Credential> {
        self.record("login");
        let state = self.state();
        state
            .users
            .iter()
            .find(|(u, p)| u.email == email && p == password)
            .map(|(u, _)| Credential {
                access_token: format!("token-{}", u.id),
                token_type: "bearer".into(),
            })
            .ok_or(ClientError::Unauthorized)
    }

    async fn me(&self) -> ClientResult<User> {
        self.record("me");
        self.caller()
    }

    async fn register(&self, registration: &Registration) -> ClientResult<User> {
        self.record("register");
        let mut state = self.state();
        if state.users.iter().any(|(u, _)| u.email == registration.email) {
            return Err(ClientError::BadRequest("Email already registered".into()));
        }
        let id = format!("user-{}", state.users.len() + 1);
        let created = User {
            id,
            email: registration.email.clone(),
            name: registration.name.clone(),
            role: registration.role,
            avatar: None,
        };
        state
            .users
            .push((created.clone(), registration.password.clone()));
        Ok(created)
    }

    async fn rooms(&self) -> ClientResult<Vec<Room>> {
        self.record("rooms");
        self.caller()?;
        Ok(self.state().rooms.clone())
    }

    async fn bookings(&self) -> ClientResult<Vec<Booking>> {
        self.record("bookings");
        self.caller()?;
        Ok(self.state().bookings.clone())
    }

    async fn create_booking(&self, request: &NewBooking) -> ClientResult<Booking> {
        self.record("create_booking");
        let caller = self.caller()?;
        let mut state = self.state();

        if find_conflict(&request.slot(), &state.bookings).is_some() {
            return Err(ClientError::Conflict(
                "This time slot conflicts with an approved booking".into(),
            ));
        }
        let room_name = state
            .rooms
            .iter()
            .find(|r| r.id == request.room_id)
            .map(|r| r.name.clone())
            .ok_or_else(|| ClientError::NotFound("Room not found or inactive".into()))?;

        state.next_id += 1;
        let booking = Booking {
            id: format!("BK-{:04}", state.next_id),
            user_id: caller.id,
            user_name: caller.name,
            room_id: request.room_id.clone(),
            room_name,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            title: request.title.clone(),
            attendees: request.attendees,
            description: request.description.clone(),
            priority: request.priority,
            status: BookingStatus::Pending,
            equipment: request.equipment.clone(),
            created_at: TimeStamp::new(),
            notes: None,
        };
        state.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn update_booking(&self, id: &str, update: &BookingUpdate) -> ClientResult<Booking> {
        self.record("update_booking");
        let caller = self.caller()?;
        let update = update.clone();
        self.with_booking(id, move |b| {
            if b.user_id != caller.id {
                return Err(ClientError::Forbidden("You can only update your own bookings".into()));
            }
            if let Some(v) = update.date {
                b.date = v;
            }
            if let Some(v) = update.start_time {
                b.start_time = v;
            }
            if let Some(v) = update.end_time {
                b.end_time = v;
            }
            if let Some(v) = update.title {
                b.title = v;
            }
            if let Some(v) = update.attendees {
                b.attendees = v;
            }
            if let Some(v) = update.priority {
                b.priority = v;
            }
            Ok(())
        })
    }

    async fn approve_booking(&self, id: &str) -> ClientResult<Booking> {
        self.record("approve_booking");
        self.admin()?;
        {
            let state = self.state();
            let booking = state
                .bookings
                .iter()
                .find(|b| b.id == id)
                .ok_or_else(|| ClientError::NotFound("Booking not found".into()))?;
            if !find_conflicts(booking, &state.bookings).is_empty() {
                return Err(ClientError::Conflict(
                    "Booking conflicts with an existing approved booking".into(),
                ));
            }
        }
        self.with_booking(id, |b| {
            if b.status != BookingStatus::Pending {
                return Err(ClientError::BadRequest("Can only approve PENDING bookings".into()));
            }
            b.status = BookingStatus::Approved;
            Ok(())
        })
    }

    async fn reject_booking(&self, id: &str, notes: &str) -> ClientResult<Booking> {
        self.record("reject_booking");
        self.admin()?;
        let notes = notes.to_string();
        self.with_booking(id, move |b| {
            if b.status != BookingStatus::Pending {
                return Err(ClientError::BadRequest("Can only reject PENDING bookings".into()));
            }
            b.status = BookingStatus::Rejected;
            b.notes = Some(notes);
            Ok(())
        })
    }

    async fn cancel_booking(&self, id: &str, notes: Option<&str>) -> ClientResult<Booking> {
        self.record("cancel_booking");
        let caller = self.caller()?;
        let notes = notes.map(str::to_string);
        self.with_booking(id, move |b| {
            if b.user_id != caller.id && caller.role != Role::Admin {
                return Err(ClientError::Forbidden("You can only cancel your own bookings".into()));
            }
            if b.status.is_terminal() {
                return Err(ClientError::BadRequest(format!("Booking is {}", b.status)));
            }
            b.status = BookingStatus::Cancelled;
            if notes.is_some() {
                b.notes = notes;
            }
            Ok(())
        })
    }

    async fn delete_booking(&self, id: &str) -> ClientResult<()> {
        self.record("delete_booking");
        self.admin()?;
        let mut state = self.state();
        let before = state.bookings.len();
        state.bookings.retain(|b| b.id != id);
        if state.bookings.len() == before {
            return Err(ClientError::NotFound("Booking not found".into()));
        }
        Ok(())
    }

    async fn cleanup_status(&self) -> ClientResult<CleanupStatus> {
        self.record("cleanup_status");
        self.admin()?;
        let policy = self.state().cleanup;
        Ok(CleanupStatus {
            enabled: policy.enabled,
            retention_days: policy.retention_days,
            cleanup_hour: policy.cleanup_hour,
            auto_cleanup_enabled: true,
        })
    }

    async fn toggle_cleanup(&self, enabled: bool) -> ClientResult<bool> {
        self.record("toggle_cleanup");
        self.admin()?;
        let mut state = self.state();
        state.cleanup.enabled = enabled;
        Ok(enabled)
    }

    async fn run_cleanup_now(&self) -> ClientResult<CleanupReport> {
        self.record("run_cleanup_now");
        self.admin()?;
        let mut state = self.state();
        let policy = state.cleanup;
        let now = Utc::now();

        let report = policy.preview(&state.bookings, now);
        state.bookings.retain(|b| !policy.is_purgeable(b, now));
        Ok(report)
    }
}

pub fn user(id: &str, name: &str, role: Role) -> User {
    User {
        id: id.into(),
        email: format!("{}@example.com", name.to_lowercase()),
        name: name.into(),
        role,
        avatar: None,
    }
}

pub fn room(id: &str, name: &str, capacity: u32) -> Room {
    Room {
        id: id.into(),
        name: name.into(),
        floor: "3".into(),
        room_number: format!("3{id}"),
        capacity,
        image_url: String::new(),
        features: vec!["Projector".into()],
    }
}

pub fn t(raw: &str) -> ClockTime {
    raw.parse().unwrap()
}

pub fn day(year: i32, month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, d).unwrap()
}

pub fn draft(room_id: &str, start: &str, end: &str, title: &str) -> BookingDraft {
    BookingDraft::new()
        .set_room(room_id)
        .set_date(day(2026, 2, 20))
        .set_start_time(t(start))
        .set_end_time(t(end))
        .set_title(title)
        .set_attendees(4)
}

/// A service over a fresh fake backend and a throwaway session store.
pub fn service() -> (BookingService<FakeBackend>, FakeBackend, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::open(&dir.path().join("session.db")).unwrap();
    let backend = FakeBackend::new();
    (BookingService::new(backend.clone(), store), backend, dir)
}

/// A second client on the same backend, with its own token and session store.
pub fn service_with(backend: &FakeBackend) -> (BookingService<FakeBackend>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::open(&dir.path().join("session.db")).unwrap();
    let mut backend = backend.clone();
    backend.set_token(None);
    (BookingService::new(backend, store), dir)
}

/// A booking created `days` ago, inserted straight into the backend.
pub fn seed_aged(backend: &FakeBackend, id: &str, status: BookingStatus, days: i64) {
    let created = Utc::now() - chrono::Duration::days(days);
    backend.state().bookings.push(Booking {
        id: id.into(),
        user_id: "user-1".into(),
        user_name: "Ada".into(),
        room_id: "R2".into(),
        room_name: "Huddle".into(),
        date: day(2026, 1, 5),
        start_time: t("09:00"),
        end_time: t("10:00"),
        title: "Old standup".into(),
        attendees: 3,
        description: String::new(),
        priority: Default::default(),
        status,
        equipment: vec![],
        created_at: TimeStamp::from(created),
        notes: None,
    });
}
