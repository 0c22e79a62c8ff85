//! Session Store: who is signed in, as what, and the booking in progress.
//!
//! The store is the only cross-workflow mutable state. Every change to the
//! authentication state is pushed to subscribers through a `watch` channel.

use parking_lot::RwLock;
use std::fmt;
use std::str::FromStr;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::draft::BookingDraft;
use crate::error::ClientError;
use crate::storage::{SessionPersistence, StoredUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClientError;

    /// Exact match only: `"Admin"` is not an admin.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ClientError::InvalidRole(other.to_string())),
        }
    }
}

/// Cached display data. Not authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub picture_uri: Option<String>,
}

impl Profile {
    pub fn from_stored(user: &StoredUser) -> Self {
        Self {
            name: user.name.clone(),
            phone: user.phone_number.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
            picture_uri: user.image.clone(),
        }
    }

    pub fn to_stored(&self, role: Role) -> StoredUser {
        StoredUser {
            name: self.name.clone(),
            role: role.as_str().to_string(),
            phone_number: non_empty(&self.phone),
            email: non_empty(&self.email),
            image: self.picture_uri.clone(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    Phone,
    Email,
    Picture,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub role: Option<Role>,
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored(Role),
    Anonymous,
}

#[derive(Debug, Clone)]
struct Credentials {
    token: String,
    role: Role,
}

#[derive(Debug, Default)]
struct Inner {
    // role only exists alongside a token
    credentials: Option<Credentials>,
    profile: Option<Profile>,
    draft: BookingDraft,
}

impl Inner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            authenticated: self.credentials.is_some(),
            role: self.credentials.as_ref().map(|c| c.role),
            profile: self.profile.clone(),
        }
    }
}

pub struct SessionStore {
    inner: RwLock<Inner>,
    persistence: SessionPersistence,
    updates: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    pub fn new(persistence: SessionPersistence) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: RwLock::new(Inner::default()),
            persistence,
            updates,
        }
    }

    fn publish(&self) {
        let snapshot = self.inner.read().snapshot();
        self.updates.send_replace(snapshot);
    }

    /// Hydrate from local storage. Never reports anything to the user.
    ///
    /// The stored token is trusted without asking the backend.
    pub async fn restore(&self) -> RestoreOutcome {
        let Some(stored) = self.persistence.load().await else {
            debug!("No stored session");
            return RestoreOutcome::Anonymous;
        };

        let usable = stored
            .user
            .as_ref()
            .and_then(|user| user.role.parse::<Role>().ok().map(|role| (user, role)));

        let Some((user, role)) = usable else {
            info!("Stored token has no usable user record, discarding it");
            if let Err(e) = self.persistence.remove_token().await {
                warn!(error = %e, "Failed to discard stale token");
            }
            return RestoreOutcome::Anonymous;
        };

        {
            let mut inner = self.inner.write();
            inner.credentials = Some(Credentials {
                token: stored.token,
                role,
            });
            inner.profile = Some(Profile::from_stored(user));
        }
        self.publish();

        info!(role = %role, "Session restored");
        RestoreOutcome::Restored(role)
    }

    /// Start a session. A storage failure is logged and the in-memory
    /// session is kept.
    pub async fn login(&self, token: String, role: Role, profile: Profile) {
        let stored = profile.to_stored(role);
        {
            let mut inner = self.inner.write();
            inner.credentials = Some(Credentials {
                token: token.clone(),
                role,
            });
            inner.profile = Some(profile);
        }
        self.publish();

        if let Err(e) = self.persistence.save(&token, &stored).await {
            warn!(error = %e, "Failed to persist session");
        }
        info!(role = %role, "Signed in");
    }

    /// Idempotent. Also drops the booking draft.
    pub async fn logout(&self) {
        let was_authenticated = {
            let mut inner = self.inner.write();
            let was = inner.credentials.is_some();
            *inner = Inner::default();
            was
        };
        self.publish();

        if let Err(e) = self.persistence.clear().await {
            warn!(error = %e, "Failed to clear stored session");
        }
        if was_authenticated {
            info!("Signed out");
        }
    }

    /// Change one cached profile attribute. Nothing is sent to the backend.
    pub fn update_profile_field(&self, field: ProfileField, value: &str) -> Result<(), ClientError> {
        {
            let mut inner = self.inner.write();
            let profile = inner.profile.as_mut().ok_or(ClientError::NotAuthenticated)?;
            match field {
                ProfileField::Name => profile.name = value.to_string(),
                ProfileField::Phone => profile.phone = value.to_string(),
                ProfileField::Email => profile.email = value.to_string(),
                ProfileField::Picture => profile.picture_uri = non_empty(value),
            }
        }
        self.publish();
        Ok(())
    }

    /// Replace the cached profile after the backend accepted an update.
    pub async fn sync_profile(&self, profile: Profile) -> Result<(), ClientError> {
        let stored = {
            let mut inner = self.inner.write();
            let role = inner
                .credentials
                .as_ref()
                .map(|c| c.role)
                .ok_or(ClientError::NotAuthenticated)?;
            let stored = profile.to_stored(role);
            inner.profile = Some(profile);
            stored
        };
        self.publish();

        if let Err(e) = self.persistence.save_user(&stored).await {
            warn!(error = %e, "Failed to persist updated profile");
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().credentials.as_ref().map(|c| c.token.clone())
    }

    pub fn require_token(&self) -> Result<String, ClientError> {
        self.token().ok_or(ClientError::NotAuthenticated)
    }

    pub fn role(&self) -> Option<Role> {
        self.inner.read().credentials.as_ref().map(|c| c.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().credentials.is_some()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.read().profile.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    pub fn draft(&self) -> BookingDraft {
        self.inner.read().draft.clone()
    }

    pub fn update_draft<R>(&self, f: impl FnOnce(&mut BookingDraft) -> R) -> R {
        f(&mut self.inner.write().draft)
    }

    pub fn take_draft(&self) -> BookingDraft {
        std::mem::take(&mut self.inner.write().draft)
    }

    pub fn clear_draft(&self) {
        self.inner.write().draft = BookingDraft::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::Catalog;
    use crate::storage::{KeyValueStore, MemoryStore, TOKEN_KEY, USER_KEY};
    use crate::testing::FailingStore;
    use std::sync::Arc;

    fn store_with(kv: Arc<dyn KeyValueStore>) -> SessionStore {
        SessionStore::new(SessionPersistence::new(kv))
    }

    fn profile() -> Profile {
        Profile {
            name: "A".into(),
            phone: "9876543210".into(),
            email: "a@b.com".into(),
            picture_uri: None,
        }
    }

    #[test]
    fn test_role_parsing_is_exact() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        for bad in ["Admin", "driver", "", " user"] {
            let err = bad.parse::<Role>().unwrap_err();
            assert_eq!(err.user_message(), "Invalid Role");
        }
    }

    #[tokio::test]
    async fn test_login_persists_and_restores() {
        let kv = Arc::new(MemoryStore::new());
        let session = store_with(kv.clone());
        session.login("t1".into(), Role::Admin, profile()).await;
        assert_eq!(session.token().as_deref(), Some("t1"));
        assert_eq!(session.role(), Some(Role::Admin));

        let stored: serde_json::Value =
            serde_json::from_str(&kv.get(USER_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored["role"], "admin");
        assert_eq!(stored["phoneNumber"], "9876543210");

        let fresh = store_with(kv);
        assert_eq!(fresh.restore().await, RestoreOutcome::Restored(Role::Admin));
        assert_eq!(fresh.profile(), Some(profile()));
        assert!(fresh.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_token_without_user_is_anonymous() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(TOKEN_KEY, "t1").await.unwrap();

        let session = store_with(kv.clone());
        assert_eq!(session.restore().await, RestoreOutcome::Anonymous);
        assert!(!session.is_authenticated());
        assert_eq!(session.role(), None);
        // stale token is dropped
        assert_eq!(kv.get(TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_unknown_role_never_grants_access() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(TOKEN_KEY, "t1").await.unwrap();
        kv.set(USER_KEY, r#"{"name":"A","role":"superadmin"}"#)
            .await
            .unwrap();

        let session = store_with(kv);
        assert_eq!(session.restore().await, RestoreOutcome::Anonymous);
        assert_eq!(session.snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn test_restore_with_unavailable_storage() {
        let session = store_with(Arc::new(FailingStore));
        assert_eq!(session.restore().await, RestoreOutcome::Anonymous);
    }

    #[tokio::test]
    async fn test_login_survives_storage_failure() {
        let session = store_with(Arc::new(FailingStore));
        session.login("t1".into(), Role::User, profile()).await;
        assert!(session.is_authenticated());
        session.logout().await;
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_twice() {
        let kv = Arc::new(MemoryStore::new());
        let session = store_with(kv.clone());
        session.login("t1".into(), Role::User, profile()).await;
        session.update_draft(|d| d.source = Catalog::Source.find("gk"));

        session.logout().await;
        session.logout().await;

        assert_eq!(session.token(), None);
        assert!(session.draft().is_empty());
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_login_and_logout() {
        let session = store_with(Arc::new(MemoryStore::new()));
        let mut rx = session.subscribe();
        assert!(!rx.borrow().authenticated);

        session.login("t1".into(), Role::User, profile()).await;
        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert!(snap.authenticated);
        assert_eq!(snap.role, Some(Role::User));

        session.logout().await;
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().authenticated);
    }

    #[tokio::test]
    async fn test_profile_field_update_is_local() {
        let kv = Arc::new(MemoryStore::new());
        let session = store_with(kv.clone());
        assert_eq!(
            session.update_profile_field(ProfileField::Name, "B"),
            Err(ClientError::NotAuthenticated)
        );

        session.login("t1".into(), Role::User, profile()).await;
        session
            .update_profile_field(ProfileField::Name, "Pemba Lama")
            .unwrap();
        assert_eq!(session.profile().unwrap().name, "Pemba Lama");

        // storage still holds the confirmed name
        let raw = kv.get(USER_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"name\":\"A\""));

        let mut confirmed = session.profile().unwrap();
        confirmed.picture_uri = Some("https://cdn.example/p.jpg".into());
        session.sync_profile(confirmed).await.unwrap();
        let raw = kv.get(USER_KEY).await.unwrap().unwrap();
        assert!(raw.contains("Pemba Lama"));
        assert!(raw.contains("p.jpg"));
    }

    #[tokio::test]
    async fn test_take_draft_leaves_empty() {
        let session = store_with(Arc::new(MemoryStore::new()));
        session.update_draft(|d| d.destination = Catalog::Destination.find("Lachung"));
        let taken = session.take_draft();
        assert_eq!(taken.destination.unwrap().value, "la");
        assert!(session.draft().is_empty());
    }
}
