//! Booking status transitions and who may trigger them
//!
//! ```text
//! Pending ──approve──▶ Approved ──cancel──▶ Cancelled
//!    │                                         ▲
//!    ├──reject──▶ Rejected                     │
//!    └──────────────────cancel─────────────────┘
//! ```
//!
//! Nothing ever returns to `Pending`. These checks gate requests on the client
//! side; the backend repeats them and is the authority.
use super::error::LifecycleError;
use super::types::{Booking, BookingStatus, BookingUpdate, Role, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject { reason: String },
    Cancel { notes: Option<String> },
}

/// Whoever is asking for a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Transition {
    pub fn target(&self) -> BookingStatus {
        match self {
            Transition::Approve => BookingStatus::Approved,
            Transition::Reject { .. } => BookingStatus::Rejected,
            Transition::Cancel { .. } => BookingStatus::Cancelled,
        }
    }
    fn verb(&self) -> &'static str {
        match self {
            Transition::Approve => "approve bookings",
            Transition::Reject { .. } => "reject bookings",
            Transition::Cancel { .. } => "cancel bookings",
        }
    }
}

impl Actor {
    pub fn new(user_id: &str, role: Role) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
        }
    }
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
    pub fn require_admin(&self, action: &'static str) -> Result<(), LifecycleError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(LifecycleError::AdminRequired(action))
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(&user.id, user.role)
    }
}

impl BookingStatus {
    /// Rejected and cancelled bookings are never reactivated.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Cancelled)
    }
    pub fn requires_approval(&self) -> bool {
        *self == BookingStatus::Pending
    }
    pub fn can_transition_to(&self, to: BookingStatus) -> bool {
        use BookingStatus::*;

        matches!(
            (*self, to),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) | (Approved, Cancelled)
        )
    }
}

/// Checks `transition` against the booking's current status and the actor's
/// permissions. Returns the status the booking would move to.
pub fn authorize(
    booking: &Booking,
    actor: &Actor,
    transition: &Transition,
) -> Result<BookingStatus, LifecycleError> {
    match transition {
        Transition::Approve | Transition::Reject { .. } => actor.require_admin(transition.verb())?,
        Transition::Cancel { .. } => {
            if !actor.is_admin() && !booking.is_owned_by(&actor.user_id) {
                return Err(LifecycleError::NotOwner(booking.id.clone()));
            }
        }
    }

    let to = transition.target();
    if !booking.status.can_transition_to(to) {
        return Err(LifecycleError::IllegalTransition {
            from: booking.status,
            to,
        });
    }

    if let Transition::Reject { reason } = transition {
        if reason.trim().is_empty() {
            return Err(LifecycleError::MissingReason);
        }
    }

    Ok(to)
}

/// Content edits are owner-only and allowed while the booking is pending.
/// The status is left unchanged by an edit.
pub fn authorize_edit(
    booking: &Booking,
    actor: &Actor,
    update: &BookingUpdate,
) -> Result<(), LifecycleError> {
    if !booking.is_owned_by(&actor.user_id) {
        return Err(LifecycleError::NotOwner(booking.id.clone()));
    }
    if booking.status != BookingStatus::Pending {
        return Err(LifecycleError::NotEditable(booking.status));
    }

    let (start, end) = update.merged_times(booking);
    if start >= end {
        return Err(LifecycleError::InvalidTimeRange);
    }

    Ok(())
}
