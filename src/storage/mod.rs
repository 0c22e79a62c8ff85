//! Durable key-value storage for the session.
//!
//! Only two keys ever exist: `token` (opaque bearer credential) and `user`
//! (JSON `{name, role, phoneNumber, email, image}`). There is no versioning
//! or migration; an unreadable entry is the same as a missing one.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ClientError;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// The cached user record, mirrored from the login response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    /// `None` when the token exists but the user record is absent or unreadable
    pub user: Option<StoredUser>,
}

/// Typed access to the `token` and `user` entries.
#[derive(Clone)]
pub struct SessionPersistence {
    store: Arc<dyn KeyValueStore>,
}

impl SessionPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the persisted session. Any storage failure reads as "no session".
    pub async fn load(&self) -> Option<StoredSession> {
        let token = match self.store.get(TOKEN_KEY).await {
            Ok(Some(token)) if !token.trim().is_empty() => token,
            Ok(_) => return None,
            Err(e) => {
                debug!(error = %e, "Could not read stored token");
                return None;
            }
        };

        let user = match self.store.get(USER_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<StoredUser>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    debug!(error = %e, "Stored user record is not valid JSON");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Could not read stored user");
                None
            }
        };

        Some(StoredSession { token, user })
    }

    pub async fn save(&self, token: &str, user: &StoredUser) -> Result<(), ClientError> {
        self.store.set(TOKEN_KEY, token).await?;
        self.save_user(user).await
    }

    pub async fn save_user(&self, user: &StoredUser) -> Result<(), ClientError> {
        let raw = serde_json::to_string(user)
            .map_err(|e| ClientError::Storage(format!("Failed to encode user: {}", e)))?;
        self.store.set(USER_KEY, &raw).await
    }

    /// Remove both entries. Attempts both even if the first fails.
    pub async fn clear(&self) -> Result<(), ClientError> {
        let user = self.store.remove(USER_KEY).await;
        let token = self.store.remove(TOKEN_KEY).await;
        if let Err(e) = &user {
            warn!(error = %e, "Failed to remove stored user");
        }
        token.and(user)
    }

    pub async fn remove_token(&self) -> Result<(), ClientError> {
        self.store.remove(TOKEN_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStore;

    fn user() -> StoredUser {
        StoredUser {
            name: "A".into(),
            role: "user".into(),
            phone_number: Some("9876543210".into()),
            email: Some("a@b.com".into()),
            image: None,
        }
    }

    #[test]
    fn test_stored_user_wire_shape() {
        let json = serde_json::to_value(user()).unwrap();
        assert_eq!(json["name"], "A");
        assert_eq!(json["role"], "user");
        assert_eq!(json["phoneNumber"], "9876543210");
        assert_eq!(json["email"], "a@b.com");
        assert!(json["image"].is_null());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let persistence = SessionPersistence::new(Arc::new(MemoryStore::new()));
        persistence.save("t1", &user()).await.unwrap();

        let loaded = persistence.load().await.unwrap();
        assert_eq!(loaded.token, "t1");
        assert_eq!(loaded.user, Some(user()));
    }

    #[tokio::test]
    async fn test_token_without_user() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "t1").await.unwrap();
        let persistence = SessionPersistence::new(store.clone());

        let loaded = persistence.load().await.unwrap();
        assert_eq!(loaded.token, "t1");
        assert!(loaded.user.is_none());

        store.set(USER_KEY, "{not json").await.unwrap();
        assert!(persistence.load().await.unwrap().user.is_none());
    }

    #[tokio::test]
    async fn test_blank_token_is_no_session() {
        let store = Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "  ").await.unwrap();
        assert!(SessionPersistence::new(store).load().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let persistence = SessionPersistence::new(Arc::new(MemoryStore::new()));
        persistence.save("t1", &user()).await.unwrap();
        persistence.clear().await.unwrap();
        persistence.clear().await.unwrap();
        assert!(persistence.load().await.is_none());
    }

    #[tokio::test]
    async fn test_unavailable_storage_reads_as_no_session() {
        let persistence = SessionPersistence::new(Arc::new(FailingStore));
        assert!(persistence.load().await.is_none());
        assert!(persistence.save("t1", &user()).await.is_err());
        assert!(persistence.clear().await.is_err());
    }
}
