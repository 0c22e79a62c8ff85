//! Scripted collaborators shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::config::Config;
use crate::error::ClientError;
use crate::gateway::{
    Booking, CreateBookingRequest, DriverAssignment, Gateway, LoginRequest, LoginResponse,
    LoginUser, ProfileUpdate, ResetPasswordRequest, SignupRequest,
};
use crate::notify::NoticeBoard;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::AppState;

/// Storage that is never available.
pub(crate) struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, ClientError> {
        Err(ClientError::Storage("unavailable".into()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), ClientError> {
        Err(ClientError::Storage("unavailable".into()))
    }

    async fn remove(&self, _key: &str) -> Result<(), ClientError> {
        Err(ClientError::Storage("unavailable".into()))
    }
}

/// Pauses a pending call until the test releases it.
#[derive(Default)]
pub(crate) struct Hold {
    pub entered: Notify,
    pub release: Notify,
}

/// In-memory backend that records every call.
#[derive(Default)]
pub(crate) struct StubGateway {
    calls: Mutex<Vec<&'static str>>,
    tokens: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, ClientError>>,
    login_user: Mutex<LoginUser>,
    bookings: Mutex<Vec<Booking>>,
    pub created: Mutex<Vec<CreateBookingRequest>>,
    pub signups: Mutex<Vec<SignupRequest>>,
    pub resets: Mutex<Vec<ResetPasswordRequest>>,
    pub otps: Mutex<Vec<String>>,
    pub assignments: Mutex<Vec<(String, DriverAssignment)>>,
    pub deleted: Mutex<Vec<String>>,
    pub profile_updates: Mutex<Vec<ProfileUpdate>>,
    create_hold: Mutex<Option<Arc<Hold>>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful logins return token `t1` and this user.
    pub fn with_login(self, username: &str, role: &str) -> Self {
        *self.login_user.lock() = LoginUser {
            username: username.to_string(),
            role: role.to_string(),
            ..Default::default()
        };
        self
    }

    pub fn with_bookings(self, bookings: Vec<Booking>) -> Self {
        *self.bookings.lock() = bookings;
        self
    }

    /// Make every call to `method` fail with `err` until [`StubGateway::recover`].
    pub fn fail(&self, method: &'static str, err: ClientError) {
        self.failures.lock().insert(method, err);
    }

    /// Keep the next `create_booking` calls pending until `release` fires.
    pub fn hold_create_booking(&self) -> Arc<Hold> {
        let hold = Arc::new(Hold::default());
        *self.create_hold.lock() = Some(hold.clone());
        hold
    }

    pub fn recover(&self, method: &'static str) {
        self.failures.lock().remove(method);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|m| **m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_token(&self) -> Option<String> {
        self.tokens.lock().last().cloned()
    }

    fn record(&self, method: &'static str, token: Option<&str>) -> Result<(), ClientError> {
        self.calls.lock().push(method);
        if let Some(token) = token {
            self.tokens.lock().push(token.to_string());
        }
        match self.failures.lock().get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Gateway for StubGateway {
    async fn login(&self, _req: &LoginRequest) -> Result<LoginResponse, ClientError> {
        self.record("login", None)?;
        Ok(LoginResponse {
            token: "t1".to_string(),
            user: self.login_user.lock().clone(),
        })
    }

    async fn signup(&self, req: &SignupRequest) -> Result<Option<String>, ClientError> {
        self.record("signup", None)?;
        self.signups.lock().push(req.clone());
        Ok(Some("User registered successfully".to_string()))
    }

    async fn send_otp(&self, email: &str) -> Result<(), ClientError> {
        self.record("send_otp", None)?;
        self.otps.lock().push(email.to_string());
        Ok(())
    }

    async fn reset_otp(&self, email: &str) -> Result<(), ClientError> {
        self.record("reset_otp", None)?;
        self.otps.lock().push(email.to_string());
        Ok(())
    }

    async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), ClientError> {
        self.record("reset_password", None)?;
        self.resets.lock().push(req.clone());
        Ok(())
    }

    async fn create_booking(
        &self,
        token: &str,
        req: &CreateBookingRequest,
    ) -> Result<(), ClientError> {
        self.record("create_booking", Some(token))?;
        let hold = self.create_hold.lock().clone();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        self.created.lock().push(req.clone());
        Ok(())
    }

    async fn list_bookings(&self, token: &str) -> Result<Vec<Booking>, ClientError> {
        self.record("list_bookings", Some(token))?;
        Ok(self.bookings.lock().clone())
    }

    async fn user_bookings(&self, token: &str) -> Result<Vec<Booking>, ClientError> {
        self.record("user_bookings", Some(token))?;
        Ok(self.bookings.lock().clone())
    }

    async fn get_booking(&self, token: &str, id: &str) -> Result<Booking, ClientError> {
        self.record("get_booking", Some(token))?;
        self.bookings
            .lock()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| ClientError::rejected(404, Some("Booking not found".into())))
    }

    async fn assign_driver(
        &self,
        token: &str,
        id: &str,
        driver: &DriverAssignment,
    ) -> Result<(), ClientError> {
        self.record("assign_driver", Some(token))?;
        self.assignments
            .lock()
            .push((id.to_string(), driver.clone()));
        Ok(())
    }

    async fn delete_booking(&self, token: &str, id: &str) -> Result<(), ClientError> {
        self.record("delete_booking", Some(token))?;
        self.deleted.lock().push(id.to_string());
        Ok(())
    }

    async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<(), ClientError> {
        self.record("update_profile", Some(token))?;
        self.profile_updates.lock().push(update.clone());
        Ok(())
    }
}

/// A booking record with just an id and a rider name.
pub(crate) fn booking(id: &str, username: &str) -> Booking {
    Booking {
        id: id.to_string(),
        username: Some(username.to_string()),
        user_id: None,
        source_location: None,
        destination_location: None,
        pickup_point: None,
        start_date: None,
        end_date: None,
        departure_time: None,
        seats: None,
        payment_status: None,
        driver: None,
    }
}

pub(crate) struct Harness {
    pub state: AppState,
    pub gateway: Arc<StubGateway>,
    pub notices: Arc<NoticeBoard>,
    pub store: Arc<MemoryStore>,
}

pub(crate) fn harness(gateway: StubGateway) -> Harness {
    let gateway = Arc::new(gateway);
    let notices = Arc::new(NoticeBoard::new());
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        Config::default(),
        gateway.clone(),
        store.clone(),
        notices.clone(),
    );
    Harness {
        state,
        gateway,
        notices,
        store,
    }
}
