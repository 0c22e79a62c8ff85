//! Client error taxonomy.
//!
//! Every failure a workflow can hit collapses into [`ClientError`], and every
//! `ClientError` renders to exactly one human-readable line through
//! [`ClientError::user_message`]. Nothing here is ever shown as a code.

use std::collections::BTreeMap;
use thiserror::Error;

/// Shown for transport failures (unreachable host, timeout, TLS).
pub const NETWORK_MESSAGE: &str = "Network error. Please check your connection and try again.";

/// Shown when the backend rejects a request without saying why.
pub const REJECTED_FALLBACK: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Missing or malformed input, caught before any request is made
    #[error("{0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response, or a 2xx envelope with `success: false`
    #[error("backend rejected request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },

    /// Response body could not be decoded into the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("Authentication token not found.")]
    NotAuthenticated,

    #[error("Invalid Role")]
    InvalidRole(String),

    #[error("backend is not configured: {0}")]
    Misconfigured(String),

    /// The same action is already in flight
    #[error("Please wait for the current request to finish.")]
    Busy,

    #[error("storage error: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn rejected(status: u16, message: Option<String>) -> Self {
        let message = message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
        Self::Rejected { status, message }
    }

    /// Whether re-invoking the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Network(_)
                | ClientError::Rejected { .. }
                | ClientError::Malformed(_)
                | ClientError::Busy
        )
    }

    /// The normalized text for a toast.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(message) => message.clone(),
            ClientError::Network(_) => NETWORK_MESSAGE.to_string(),
            ClientError::Rejected { message, .. } => message
                .clone()
                .unwrap_or_else(|| REJECTED_FALLBACK.to_string()),
            ClientError::Malformed(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    REJECTED_FALLBACK.to_string()
                } else {
                    raw.to_string()
                }
            }
            ClientError::Misconfigured(_) => {
                "The app is not configured to reach the booking service.".to_string()
            }
            ClientError::Storage(_) => "Could not access local storage.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Malformed(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Collects per-field validation messages for a form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Drop any messages recorded for `field`.
    pub fn clear(&mut self, field: &str) {
        self.errors.remove(field);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// First message of the first failing field; this is what gets toasted.
    pub fn first_message(&self) -> Option<&str> {
        self.errors
            .values()
            .next()
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn finish(&self) -> Result<(), ClientError> {
        match self.first_message() {
            Some(message) => Err(ClientError::validation(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_passthrough() {
        let err = ClientError::validation("Please fill in all fields");
        assert_eq!(err.user_message(), "Please fill in all fields");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_network_message_is_generic() {
        let err = ClientError::Network("connection refused (os error 111)".into());
        assert_eq!(err.user_message(), NETWORK_MESSAGE);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rejected_uses_backend_message() {
        let err = ClientError::rejected(400, Some("Seats unavailable".into()));
        assert_eq!(err.user_message(), "Seats unavailable");
    }

    #[test]
    fn test_rejected_blank_message_falls_back() {
        let err = ClientError::rejected(500, Some("   ".into()));
        assert_eq!(err, ClientError::Rejected { status: 500, message: None });
        assert_eq!(err.user_message(), REJECTED_FALLBACK);
    }

    #[test]
    fn test_malformed_shows_raw_text() {
        let err = ClientError::Malformed("<html>Bad Gateway</html>\n".into());
        assert_eq!(err.user_message(), "<html>Bad Gateway</html>");
        assert_eq!(ClientError::Malformed(String::new()).user_message(), REJECTED_FALLBACK);
    }

    #[test]
    fn test_invalid_role_text() {
        assert_eq!(
            ClientError::InvalidRole("driver".into()).user_message(),
            "Invalid Role"
        );
    }

    #[test]
    fn test_field_errors() {
        let mut errors = FieldErrors::new();
        assert!(errors.finish().is_ok());

        errors.add("phone", "Phone number must be exactly 10 digits");
        errors.add("email", "Please enter a valid email address");
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get("phone"),
            Some("Phone number must be exactly 10 digits")
        );

        // BTreeMap ordering: "email" sorts first
        assert_eq!(
            errors.finish(),
            Err(ClientError::validation("Please enter a valid email address"))
        );

        errors.clear("email");
        errors.clear("phone");
        assert!(errors.is_empty());
    }
}
