//! Success/failure notifications.
//!
//! The controller reports outcomes through `NotificationSink`; the TUI shows
//! them as auto-dismissing toasts and the CLI prints them to stderr.

use std::cell::RefCell;
use std::time::{Duration, Instant};

pub trait NotificationSink {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    created: Instant,
}

/// Queue of toasts that expire after a fixed interval.
#[derive(Debug)]
pub struct Toasts {
    ttl: Duration,
    entries: RefCell<Vec<Toast>>,
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RefCell::new(Vec::new()),
        }
    }

    fn push(&self, kind: ToastKind, message: &str) {
        self.entries.borrow_mut().push(Toast {
            kind,
            message: message.to_string(),
            created: Instant::now(),
        });
    }

    /// Drop expired toasts. Returns true when anything was removed.
    pub fn prune(&self) -> bool {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|toast| now.saturating_duration_since(toast.created) < self.ttl);
        entries.len() != before
    }

    /// Oldest first.
    pub fn visible(&self) -> Vec<Toast> {
        self.entries.borrow().clone()
    }

    pub fn dismiss_all(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl NotificationSink for Toasts {
    fn success(&self, message: &str) {
        self.push(ToastKind::Success, message);
    }

    fn error(&self, message: &str) {
        self.push(ToastKind::Error, message);
    }
}

/// Prints notifications for non-interactive runs.
#[derive(Debug, Default)]
pub struct StderrSink;

impl NotificationSink for StderrSink {
    fn success(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("error: {}", message);
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: RefCell<Vec<(ToastKind, String)>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn last(&self) -> Option<(ToastKind, String)> {
        self.messages.borrow().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.messages.borrow().len()
    }
}

#[cfg(test)]
impl NotificationSink for RecordingSink {
    fn success(&self, message: &str) {
        self.messages
            .borrow_mut()
            .push((ToastKind::Success, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages
            .borrow_mut()
            .push((ToastKind::Error, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire_after_ttl() {
        let toasts = Toasts::new(Duration::from_millis(3000));
        toasts.success("Contact created successfully");
        assert_eq!(toasts.visible().len(), 1);

        let created = toasts.visible()[0].created;
        assert!(!toasts.prune_at(created + Duration::from_millis(2999)));
        assert!(toasts.prune_at(created + Duration::from_millis(3000)));
        assert!(toasts.visible().is_empty());
    }

    #[test]
    fn test_toast_order_and_kind() {
        let toasts = Toasts::new(Duration::from_secs(3));
        toasts.success("first");
        toasts.error("second");
        let visible = toasts.visible();
        assert_eq!(visible[0].kind, ToastKind::Success);
        assert_eq!(visible[1].message, "second");
        toasts.dismiss_all();
        assert!(toasts.visible().is_empty());
    }
}
