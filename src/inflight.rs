//! At most one submission per action at a time.
//!
//! A workflow acquires an [`InFlightGuard`] before it calls the backend and
//! holds it across the await. Dropping the guard releases the action, on
//! every exit path.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKey {
    SignIn,
    SignUp,
    SendOtp,
    ResetPassword,
    SubmitBooking,
    UpdateProfile,
    /// Driver assignment and cancellation share one key per booking
    Booking(String),
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKey::SignIn => f.write_str("sign-in"),
            ActionKey::SignUp => f.write_str("sign-up"),
            ActionKey::SendOtp => f.write_str("send-otp"),
            ActionKey::ResetPassword => f.write_str("reset-password"),
            ActionKey::SubmitBooking => f.write_str("submit-booking"),
            ActionKey::UpdateProfile => f.write_str("update-profile"),
            ActionKey::Booking(id) => write!(f, "booking/{}", id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InFlight {
    active: Arc<DashMap<ActionKey, Instant>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or fail with [`ClientError::Busy`] if it is already claimed.
    pub fn try_acquire(&self, key: ActionKey) -> Result<InFlightGuard, ClientError> {
        match self.active.entry(key.clone()) {
            Entry::Occupied(_) => {
                debug!(action = %key, "Action already in flight");
                Err(ClientError::Busy)
            }
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Ok(InFlightGuard {
                    active: Arc::clone(&self.active),
                    key,
                })
            }
        }
    }

    /// Whether the control for `key` should be shown disabled.
    pub fn is_busy(&self, key: &ActionKey) -> bool {
        self.active.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[must_use = "the action is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    active: Arc<DashMap<ActionKey, Instant>>,
    key: ActionKey,
}

impl InFlightGuard {
    pub fn key(&self) -> &ActionKey {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some((_, started)) = self.active.remove(&self.key) {
            debug!(action = %self.key, elapsed_ms = started.elapsed().as_millis() as u64, "Action released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_busy() {
        let inflight = InFlight::new();
        let guard = inflight.try_acquire(ActionKey::SubmitBooking).unwrap();
        assert!(inflight.is_busy(&ActionKey::SubmitBooking));
        assert_eq!(
            inflight.try_acquire(ActionKey::SubmitBooking).err(),
            Some(ClientError::Busy)
        );

        drop(guard);
        assert!(!inflight.is_busy(&ActionKey::SubmitBooking));
        assert!(inflight.try_acquire(ActionKey::SubmitBooking).is_ok());
    }

    #[test]
    fn test_keys_are_independent() {
        let inflight = InFlight::new();
        let _a = inflight.try_acquire(ActionKey::Booking("b1".into())).unwrap();
        let _b = inflight.try_acquire(ActionKey::Booking("b2".into())).unwrap();
        let _c = inflight.try_acquire(ActionKey::SignIn).unwrap();
        assert_eq!(inflight.len(), 3);
        assert!(inflight.try_acquire(ActionKey::Booking("b1".into())).is_err());
    }

    #[test]
    fn test_released_on_early_return() {
        fn fails(inflight: &InFlight) -> Result<(), ClientError> {
            let _guard = inflight.try_acquire(ActionKey::UpdateProfile)?;
            Err(ClientError::Network("timeout".into()))
        }

        let inflight = InFlight::new();
        assert!(fails(&inflight).is_err());
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_released_when_task_panics() {
        let inflight = InFlight::new();
        let shared = inflight.clone();
        let handle = tokio::spawn(async move {
            let _guard = shared.try_acquire(ActionKey::SignUp).unwrap();
            panic!("boom");
        });
        assert!(handle.await.is_err());
        assert!(!inflight.is_busy(&ActionKey::SignUp));
    }
}
