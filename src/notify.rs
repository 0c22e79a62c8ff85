//! Transient user notices ("toasts").
//!
//! Rendering is someone else's job; workflows only hand a [`Notice`] to the
//! injected [`Notifier`].

use parking_lot::Mutex;
use std::fmt;
use tracing::{info, warn};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Error notice carrying the normalized text of `err`.
    pub fn from_error(title: impl Into<String>, err: &ClientError) -> Self {
        Self::error(title, err.user_message())
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self.kind {
            NoticeKind::Success => "[OK]",
            NoticeKind::Error => "[!!]",
        };
        write!(f, "{} {}: {}", icon, self.title, self.message)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Sends notices to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => info!(title = %notice.title, "{}", notice.message),
            NoticeKind::Error => warn!(title = %notice.title, "{}", notice.message),
        }
    }
}

/// Keeps every notice in order of arrival.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.lock().last().cloned()
    }

    pub fn last_error(&self) -> Option<Notice> {
        self.notices
            .lock()
            .iter()
            .rev()
            .find(|n| n.is_error())
            .cloned()
    }

    /// Remove and return everything collected so far.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl Notifier for NoticeBoard {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display() {
        assert_eq!(
            Notice::success("Sign In", "Welcome, A").to_string(),
            "[OK] Sign In: Welcome, A"
        );
        assert_eq!(
            Notice::error("Error", "Invalid Role").to_string(),
            "[!!] Error: Invalid Role"
        );
    }

    #[test]
    fn test_notice_board_order() {
        let board = NoticeBoard::new();
        board.notify(Notice::error("Error", "first"));
        board.notify(Notice::success("Done", "second"));

        assert_eq!(board.last().unwrap().message, "second");
        assert_eq!(board.last_error().unwrap().message, "first");
        assert_eq!(board.drain().len(), 2);
        assert!(board.all().is_empty());
    }

    #[test]
    fn test_from_error_uses_user_message() {
        let notice = Notice::from_error("Booking Error", &ClientError::rejected(409, Some("x".into())));
        assert!(notice.is_error());
        assert_eq!(notice.message, "x");
    }
}
