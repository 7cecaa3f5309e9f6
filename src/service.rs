//! Service layer API for booking workflow operations
//!
//! Every write goes to the backend first and is never applied locally. After a
//! successful write the cached rooms and bookings are replaced wholesale with a
//! fresh fetch, which picks up anything the backend changed on its own.
use super::activity::ActivityLog;
use super::conflict;
use super::error::{ClientError, ServiceError};
use super::http::BookingBackend;
use super::lifecycle::{self, Actor, Transition};
use super::session::{Session, SessionStore};
use super::types::{
    Booking, BookingDraft, BookingUpdate, CleanupReport, CleanupStatus, Registration, Role, Room,
    User,
};
use super::utils::snapshot_digest;
use tracing::{debug, info, warn};

/// Result of a cache refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Changed,
    Unchanged,
}

pub struct BookingService<B: BookingBackend> {
    backend: B,
    store: SessionStore,
    session: Option<Session>,
    rooms: Vec<Room>,
    bookings: Vec<Booking>,
    snapshot: Option<String>,
    activity: ActivityLog,
}

impl<B: BookingBackend> BookingService<B> {
    pub fn new(backend: B, store: SessionStore) -> Self {
        Self {
            backend,
            store,
            session: None,
            rooms: vec![],
            bookings: vec![],
            snapshot: None,
            activity: ActivityLog::new(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Bookings owned by the logged-in user.
    pub fn my_bookings(&self) -> Vec<&Booking> {
        match &self.session {
            Some(session) => self
                .bookings
                .iter()
                .filter(|b| b.is_owned_by(&session.user.id))
                .collect(),
            None => vec![],
        }
    }

    pub fn booking(&self, id: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    fn actor(&self) -> Result<Actor, ServiceError> {
        self.session
            .as_ref()
            .map(Session::actor)
            .ok_or(ServiceError::NotAuthenticated)
    }

    fn cached(&self, id: &str) -> Result<&Booking, ServiceError> {
        self.booking(id)
            .ok_or_else(|| ServiceError::UnknownBooking(id.to_string()))
    }

    /// Drops the session in memory and on disk along with every cached copy.
    fn teardown(&mut self) -> Result<(), ServiceError> {
        self.session = None;
        self.backend.set_token(None);
        self.rooms.clear();
        self.bookings.clear();
        self.snapshot = None;
        self.store.clear()?;
        Ok(())
    }

    /// Maps a backend failure. A 401 ends the session.
    fn guard<T>(
        &mut self,
        result: Result<T, ClientError>,
        action: &str,
    ) -> Result<T, ServiceError> {
        match result {
            Ok(value) => Ok(value),
            Err(ClientError::Unauthorized) => {
                self.activity
                    .record_failure(format!("Session rejected during {action}, logging out"));
                self.teardown()?;
                Err(ServiceError::SessionExpired)
            }
            Err(err) => {
                self.activity
                    .record_failure(format!("{action} failed: {err}"));
                Err(err.into())
            }
        }
    }

    /// Restores a previously saved session, if any, and syncs the cache.
    pub async fn restore_session(&mut self) -> Result<bool, ServiceError> {
        let Some(session) = self.store.load()? else {
            return Ok(false);
        };

        self.backend
            .set_token(Some(session.token().to_string()));
        self.activity
            .record(format!("Session restored for {}", session.user.name));
        self.session = Some(session);
        self.refresh().await?;

        Ok(true)
    }

    /// Log in, fetch the profile, persist the session and load the cache
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, ServiceError> {
        let result = self.backend.login(email, password).await;
        let credential = match result {
            Ok(credential) => credential,
            Err(ClientError::Unauthorized) => {
                self.activity
                    .record_failure(format!("Login rejected for {email}"));
                return Err(ServiceError::AuthenticationFailed);
            }
            Err(err) => return self.guard(Err(err), "login"),
        };

        self.backend
            .set_token(Some(credential.access_token.clone()));
        let result = self.backend.me().await;
        let user = match result {
            Ok(user) => user,
            Err(err) => {
                self.backend.set_token(None);
                return self.guard(Err(err), "profile lookup");
            }
        };

        let session = Session::new(credential, user.clone());
        self.store.save(&session)?;
        self.session = Some(session);
        self.activity
            .record(format!("{} session established: {}", user.role, user.name));

        self.sync_after_write().await;
        Ok(user)
    }

    /// Self-service sign up followed by a login with the same credentials
    pub async fn register(
        &mut self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        let registration = Registration::new(email, name, password)?;

        let result = self.backend.register(&registration).await;
        let created = self.guard(result, "registration")?;
        info!(user_id = %created.id, "registered new user");

        self.login(&registration.email, &registration.password)
            .await
    }

    /// Create an account for someone else with the given role (admin only).
    /// The admin's own session is untouched.
    pub async fn create_user(
        &mut self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<User, ServiceError> {
        self.actor()?.require_admin("create accounts")?;
        let registration = Registration::new(email, name, password)?.set_role(role);

        let result = self.backend.register(&registration).await;
        let created = self.guard(result, "account creation")?;
        self.activity
            .record(format!("{} account created for {}", created.role, created.name));

        Ok(created)
    }

    pub fn logout(&mut self) -> Result<(), ServiceError> {
        if let Some(user) = self.current_user() {
            let message = format!("{} logged out", user.name);
            self.activity.record(message);
        }
        self.teardown()
    }

    /// Replace the cached rooms and bookings with the backend's current lists
    pub async fn refresh(&mut self) -> Result<SyncOutcome, ServiceError> {
        if self.session.is_none() {
            return Err(ServiceError::NotAuthenticated);
        }

        let rooms = self.backend.rooms().await;
        let rooms = self.guard(rooms, "room sync")?;
        let bookings = self.backend.bookings().await;
        let bookings = self.guard(bookings, "booking sync")?;

        let digest = match snapshot_digest(&bookings) {
            Ok(digest) => Some(digest),
            Err(err) => {
                warn!("failed to digest booking snapshot: {err}");
                None
            }
        };
        let outcome = if digest.is_some() && digest == self.snapshot {
            SyncOutcome::Unchanged
        } else {
            SyncOutcome::Changed
        };
        debug!(rooms = rooms.len(), bookings = bookings.len(), ?outcome, "cache refreshed");

        self.rooms = rooms;
        self.bookings = bookings;
        self.snapshot = digest;

        Ok(outcome)
    }

    // Writes already succeeded at this point, so a failed re-sync is only logged
    async fn sync_after_write(&mut self) {
        if let Err(err) = self.refresh().await {
            warn!("re-sync after write failed: {err}");
        }
    }

    /// Submit a new booking request. The backend creates it as pending
    pub async fn create_booking(&mut self, draft: BookingDraft) -> Result<Booking, ServiceError> {
        let request = draft.validate_and_finalise()?;
        self.actor()?;

        if let Some(occupant) = conflict::find_conflict(&request.slot(), &self.bookings) {
            info!(
                occupant = %occupant.id,
                "requested slot overlaps an approved booking, backend will decide"
            );
        }

        let result = self.backend.create_booking(&request).await;
        let booking = self.guard(result, "booking submission")?;
        self.activity
            .record(format!("Booking {} submitted for approval", booking.id));

        self.sync_after_write().await;
        Ok(booking)
    }

    /// Ask for a slot that is already approved for someone else.
    ///
    /// This is an ordinary pending request; the occupant keeps the slot until
    /// an admin cancels it explicitly.
    pub async fn request_override(
        &mut self,
        draft: BookingDraft,
    ) -> Result<Booking, ServiceError> {
        let request = draft.validate_and_finalise()?;
        if let Some(occupant) = conflict::find_conflict(&request.slot(), &self.bookings) {
            let message = format!(
                "Override requested for {} held by {}",
                occupant.room_name, occupant.user_name
            );
            self.activity.record(message);
        }

        self.create_booking(draft).await
    }

    /// Edit a pending booking's content. The status is not touched
    pub async fn update_booking(
        &mut self,
        id: &str,
        update: BookingUpdate,
    ) -> Result<Booking, ServiceError> {
        let actor = self.actor()?;
        lifecycle::authorize_edit(self.cached(id)?, &actor, &update)?;
        if update.is_empty() {
            return self.cached(id).cloned();
        }

        let result = self.backend.update_booking(id, &update).await;
        let booking = self.guard(result, "booking update")?;
        self.activity
            .record(format!("Booking {} updated", booking.id));

        self.sync_after_write().await;
        Ok(booking)
    }

    /// Approve a pending booking (admin only).
    ///
    /// An approved booking that overlaps is left alone; cancel it separately.
    pub async fn approve(&mut self, id: &str) -> Result<Booking, ServiceError> {
        self.transition(id, Transition::Approve).await
    }

    /// Reject a pending booking with a reason (admin only)
    pub async fn reject(&mut self, id: &str, reason: &str) -> Result<Booking, ServiceError> {
        self.transition(
            id,
            Transition::Reject {
                reason: reason.trim().to_string(),
            },
        )
        .await
    }

    /// Cancel a pending or approved booking (owner or admin)
    pub async fn cancel(&mut self, id: &str, notes: Option<&str>) -> Result<Booking, ServiceError> {
        self.transition(
            id,
            Transition::Cancel {
                notes: notes.map(str::to_string),
            },
        )
        .await
    }

    async fn transition(
        &mut self,
        id: &str,
        transition: Transition,
    ) -> Result<Booking, ServiceError> {
        let actor = self.actor()?;
        let booking = self.cached(id)?;
        let to = lifecycle::authorize(booking, &actor, &transition)?;

        if transition == Transition::Approve {
            if let Some(occupant) = conflict::find_conflict(&booking.slot(), &self.bookings) {
                warn!(
                    booking = %id,
                    occupant = %occupant.id,
                    "approving over an existing approved booking"
                );
            }
        }

        let result = match &transition {
            Transition::Approve => self.backend.approve_booking(id).await,
            Transition::Reject { reason } => self.backend.reject_booking(id, reason).await,
            Transition::Cancel { notes } => {
                self.backend
                    .cancel_booking(id, notes.as_deref())
                    .await
            }
        };
        let booking = self.guard(result, "status update")?;
        self.activity
            .record(format!("Booking {} moved to {to}", booking.id));

        self.sync_after_write().await;
        Ok(booking)
    }

    /// Permanently delete a booking (admin only)
    pub async fn delete_booking(&mut self, id: &str) -> Result<(), ServiceError> {
        self.actor()?.require_admin("delete bookings")?;

        let result = self.backend.delete_booking(id).await;
        self.guard(result, "booking deletion")?;
        self.activity.record(format!("Booking {id} deleted"));

        self.sync_after_write().await;
        Ok(())
    }

    /// First approved booking the cached booking `id` would collide with.
    pub fn conflict_for(&self, id: &str) -> Result<Option<&Booking>, ServiceError> {
        let booking = self.cached(id)?;
        Ok(conflict::find_conflicts(booking, &self.bookings)
            .into_iter()
            .next())
    }

    /// Pending requests paired with the approved booking blocking each one.
    pub fn collisions(&self) -> Result<Vec<(&Booking, &Booking)>, ServiceError> {
        self.actor()?.require_admin("review collisions")?;
        Ok(conflict::collisions(&self.bookings))
    }

    pub async fn cleanup_status(&mut self) -> Result<CleanupStatus, ServiceError> {
        self.actor()?.require_admin("view cleanup settings")?;

        let result = self.backend.cleanup_status().await;
        self.guard(result, "cleanup status")
    }

    pub async fn toggle_cleanup(&mut self, enabled: bool) -> Result<bool, ServiceError> {
        self.actor()?.require_admin("change cleanup settings")?;

        let result = self.backend.toggle_cleanup(enabled).await;
        let enabled = self.guard(result, "cleanup toggle")?;
        let state = if enabled { "enabled" } else { "disabled" };
        self.activity.record(format!("Automatic cleanup {state}"));

        Ok(enabled)
    }

    /// Trigger a cleanup run now. Removed bookings disappear from the cache on re-sync
    pub async fn run_cleanup_now(&mut self) -> Result<CleanupReport, ServiceError> {
        self.actor()?.require_admin("run cleanup")?;

        let result = self.backend.run_cleanup_now().await;
        let report = self.guard(result, "cleanup run")?;
        self.activity
            .record(format!("Cleanup removed {} resolved bookings", report.total));

        self.sync_after_write().await;
        Ok(report)
    }
}
