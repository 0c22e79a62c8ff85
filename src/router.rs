//! Workflow Router.
//!
//! Which screen stack is mounted, and which screen of it is visible, changes
//! only through [`Router::transition`]. The whole transition table lives in
//! [`resolve`], a pure function that can be tested without any I/O.

use std::fmt;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::session::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteState {
    Unauthenticated,
    AuthenticatedUser,
    AuthenticatedAdmin,
}

impl RouteState {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::User => RouteState::AuthenticatedUser,
            Role::Admin => RouteState::AuthenticatedAdmin,
        }
    }

    /// Landing screen of the stack.
    pub fn home(&self) -> Screen {
        match self {
            RouteState::Unauthenticated => Screen::SignIn,
            RouteState::AuthenticatedUser => Screen::Home,
            RouteState::AuthenticatedAdmin => Screen::AdminHome,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, RouteState::Unauthenticated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Screen {
    // auth stack
    SignIn,
    SignUp,
    ForgotPassword,
    // user stack
    Home,
    BookRide,
    ConfirmBooking,
    BookingDone,
    Trips,
    Profile,
    // admin stack
    AdminHome,
    BookingDetail { id: String },
    DriverAllocation { id: String },
    AllotmentStatus { id: String },
}

impl Screen {
    /// The stack this screen belongs to.
    pub fn stack(&self) -> RouteState {
        match self {
            Screen::SignIn | Screen::SignUp | Screen::ForgotPassword => RouteState::Unauthenticated,
            Screen::Home
            | Screen::BookRide
            | Screen::ConfirmBooking
            | Screen::BookingDone
            | Screen::Trips
            | Screen::Profile => RouteState::AuthenticatedUser,
            Screen::AdminHome
            | Screen::BookingDetail { .. }
            | Screen::DriverAllocation { .. }
            | Screen::AllotmentStatus { .. } => RouteState::AuthenticatedAdmin,
        }
    }

    /// Screens reachable only as the outcome of a workflow step.
    fn is_outcome(&self) -> bool {
        matches!(
            self,
            Screen::ConfirmBooking | Screen::BookingDone | Screen::AllotmentStatus { .. }
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::SignIn => f.write_str("sign-in"),
            Screen::SignUp => f.write_str("sign-up"),
            Screen::ForgotPassword => f.write_str("forgot-password"),
            Screen::Home => f.write_str("home"),
            Screen::BookRide => f.write_str("book-ride"),
            Screen::ConfirmBooking => f.write_str("confirm-booking"),
            Screen::BookingDone => f.write_str("booking-done"),
            Screen::Trips => f.write_str("trips"),
            Screen::Profile => f.write_str("profile"),
            Screen::AdminHome => f.write_str("admin-home"),
            Screen::BookingDetail { id } => write!(f, "booking-detail/{}", id),
            Screen::DriverAllocation { id } => write!(f, "driver-allocation/{}", id),
            Screen::AllotmentStatus { id } => write!(f, "allotment-status/{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Cold-start restore finished; `None` when there was no usable session
    Restored(Option<Role>),
    LoggedIn(Role),
    LoggedOut,
    Open(Screen),
    Back,
    /// Every required draft field is set
    DraftReady,
    BookingSubmitted,
    DriverAssigned { booking_id: String },
    BookingCancelled { booking_id: String },
    SignedUp,
    PasswordReset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub state: RouteState,
    pub screen: Screen,
}

impl Position {
    fn at(state: RouteState, screen: Screen) -> Option<Self> {
        Some(Self { state, screen })
    }

    fn home_of(state: RouteState) -> Option<Self> {
        Self::at(state, state.home())
    }
}

/// The transition table.
///
/// `Ok(None)` means the event does not apply to the current position: a
/// completion arriving after the user moved elsewhere. It is dropped.
pub fn resolve(from: &Position, event: &Event) -> Result<Option<Position>, ClientError> {
    use RouteState::*;

    let next = match (from.state, event) {
        (_, Event::LoggedOut) => Position::home_of(Unauthenticated),

        (Unauthenticated, Event::Restored(Some(role))) => {
            Position::home_of(RouteState::for_role(*role))
        }
        (_, Event::Restored(_)) => None,

        (Unauthenticated, Event::LoggedIn(role)) => Position::home_of(RouteState::for_role(*role)),
        (_, Event::LoggedIn(_)) => {
            return Err(ClientError::validation(
                "Already signed in. Sign out first.",
            ))
        }

        (state, Event::Open(screen)) => {
            if screen.stack() != state {
                return Err(ClientError::validation(format!(
                    "The {} screen is not available here",
                    screen
                )));
            }
            if screen.is_outcome() {
                return Err(ClientError::validation(format!(
                    "The {} screen cannot be opened directly",
                    screen
                )));
            }
            Position::at(state, screen.clone())
        }

        (state, Event::Back) => {
            let screen = match &from.screen {
                Screen::SignUp | Screen::ForgotPassword => Screen::SignIn,
                Screen::ConfirmBooking => Screen::BookRide,
                Screen::BookRide | Screen::BookingDone | Screen::Trips | Screen::Profile => {
                    Screen::Home
                }
                Screen::BookingDetail { .. } | Screen::AllotmentStatus { .. } => Screen::AdminHome,
                Screen::DriverAllocation { id } => Screen::BookingDetail { id: id.clone() },
                home => home.clone(),
            };
            Position::at(state, screen)
        }

        (AuthenticatedUser, Event::DraftReady) if from.screen == Screen::BookRide => {
            Position::at(AuthenticatedUser, Screen::ConfirmBooking)
        }
        (AuthenticatedUser, Event::BookingSubmitted) if from.screen == Screen::ConfirmBooking => {
            Position::at(AuthenticatedUser, Screen::BookingDone)
        }

        (AuthenticatedAdmin, Event::DriverAssigned { booking_id }) => match &from.screen {
            Screen::DriverAllocation { id } if id == booking_id => Position::at(
                AuthenticatedAdmin,
                Screen::AllotmentStatus { id: id.clone() },
            ),
            _ => None,
        },
        (AuthenticatedAdmin, Event::BookingCancelled { booking_id }) => match &from.screen {
            Screen::BookingDetail { id } | Screen::DriverAllocation { id } if id == booking_id => {
                Position::home_of(AuthenticatedAdmin)
            }
            _ => None,
        },

        (Unauthenticated, Event::SignedUp) if from.screen == Screen::SignUp => {
            Position::home_of(Unauthenticated)
        }
        (Unauthenticated, Event::PasswordReset) if from.screen == Screen::ForgotPassword => {
            Position::home_of(Unauthenticated)
        }

        _ => None,
    };

    Ok(next)
}

#[derive(Debug, Clone)]
pub struct Router {
    position: Position,
    restored: bool,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Cold start: unauthenticated, waiting for the one restore result.
    pub fn new() -> Self {
        Self {
            position: Position {
                state: RouteState::Unauthenticated,
                screen: Screen::SignIn,
            },
            restored: false,
        }
    }

    pub fn state(&self) -> RouteState {
        self.position.state
    }

    pub fn screen(&self) -> &Screen {
        &self.position.screen
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Apply one event and return the now-visible screen.
    pub fn transition(&mut self, event: Event) -> Result<&Screen, ClientError> {
        if let Event::Restored(_) = event {
            if self.restored {
                debug!("Ignoring repeated restore");
                return Ok(&self.position.screen);
            }
            self.restored = true;
        }

        match resolve(&self.position, &event)? {
            Some(next) => {
                if next.state != self.position.state {
                    info!(from = ?self.position.state, to = ?next.state, "Route state changed");
                }
                debug!(screen = %next.screen, "Navigated");
                self.position = next;
            }
            None => {
                debug!(event = ?event, screen = %self.position.screen, "Event does not apply here, dropped");
            }
        }
        Ok(&self.position.screen)
    }
}
