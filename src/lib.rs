pub mod cli;
pub mod config;
pub mod draft;
pub mod error;
pub mod gateway;
pub mod inflight;
pub mod notify;
pub mod router;
pub mod session;
pub mod storage;
pub mod validation;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

use parking_lot::Mutex;
use std::sync::Arc;

use config::Config;
use error::ClientError;
use gateway::{Gateway, HttpGateway};
use inflight::InFlight;
use notify::{Notice, Notifier};
use router::{Event, Router, Screen};
use session::SessionStore;
use storage::{FileStore, KeyValueStore, SessionPersistence};

/// Everything a workflow needs, passed explicitly.
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<dyn Gateway>,
    pub session: SessionStore,
    pub router: Mutex<Router>,
    pub notifier: Arc<dyn Notifier>,
    pub inflight: InFlight,
}

impl AppState {
    pub fn new(
        config: Config,
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            gateway,
            session: SessionStore::new(SessionPersistence::new(store)),
            router: Mutex::new(Router::new()),
            notifier,
            inflight: InFlight::new(),
        }
    }

    /// Wire the HTTP gateway and file storage from configuration.
    pub fn from_config(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self, ClientError> {
        let gateway = Arc::new(HttpGateway::new(&config.api)?);
        let store = Arc::new(FileStore::new(config.storage.data_dir.clone()));
        Ok(Self::new(config, gateway, store, notifier))
    }

    pub fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Drive the router and return the screen now visible.
    pub fn navigate(&self, event: Event) -> Result<Screen, ClientError> {
        self.router.lock().transition(event).cloned()
    }

    pub fn screen(&self) -> Screen {
        self.router.lock().screen().clone()
    }
}
