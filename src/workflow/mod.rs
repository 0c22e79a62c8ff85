//! Sub-workflows: each one sequences session, gateway, router and notices
//! for one part of the app.

pub mod admin;
pub mod auth;
pub mod booking;
pub mod profile;

use std::future::Future;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::inflight::ActionKey;
use crate::notify::Notice;
use crate::session::Role;
use crate::AppState;

/// Report `err` as a notice and hand it back.
pub(crate) fn reject<T>(state: &AppState, title: &str, err: ClientError) -> Result<T, ClientError> {
    state.notify(Notice::from_error(title, &err));
    Err(err)
}

/// Run one backend call as a guarded submission.
///
/// The action stays claimed until the call has finished and any failure
/// has been reported.
pub(crate) async fn submit<T, F, Fut>(
    state: &AppState,
    key: ActionKey,
    title: &str,
    call: F,
) -> Result<T, ClientError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let _guard = match state.inflight.try_acquire(key.clone()) {
        Ok(guard) => guard,
        Err(e) => return reject(state, title, e),
    };

    debug!(action = %key, "Submitting");
    match call().await {
        Ok(value) => Ok(value),
        Err(e) => {
            info!(action = %key, error = %e, "Submission failed");
            reject(state, title, e)
        }
    }
}

/// The session token, provided the signed-in role is `role`.
pub(crate) fn token_for(state: &AppState, role: Role, title: &str) -> Result<String, ClientError> {
    let token = match state.session.require_token() {
        Ok(token) => token,
        Err(e) => return reject(state, title, e),
    };
    if state.session.role() != Some(role) {
        return reject(
            state,
            title,
            ClientError::validation(format!("This action requires a {} account", role)),
        );
    }
    Ok(token)
}
