//! Notifier
//!
//! User-facing success/failure reporting. The core decides what to say and
//! when; delivery belongs to the host application.

use std::sync::Mutex;

/// Notification capability (fire-and-forget).
pub trait Notifier: Send + Sync {
    /// Report a successful action.
    fn notify_success(&self, message: &str);

    /// Report a failed action.
    fn notify_failure(&self, message: &str);
}

/// Notifier that emits notifications as tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, message: &str) {
        tracing::info!(target: "apikeys::notify", kind = "success", "{}", message);
    }

    fn notify_failure(&self, message: &str) {
        tracing::warn!(target: "apikeys::notify", kind = "failure", "{}", message);
    }
}

/// Kind of a recorded notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Failure,
}

/// Recorded notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Notifier that records everything it is told, for tests.
#[derive(Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create new recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications in the order received.
    pub fn get_notifications(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Success messages.
    pub fn successes(&self) -> Vec<String> {
        self.messages(NotificationKind::Success)
    }

    /// Failure messages.
    pub fn failures(&self) -> Vec<String> {
        self.messages(NotificationKind::Failure)
    }

    /// Clear all recorded notifications.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn messages(&self, kind: NotificationKind) -> Vec<String> {
        self.get_notifications()
            .into_iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.message)
            .collect()
    }

    fn record(&self, kind: NotificationKind, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Notification {
                kind,
                message: message.to_string(),
            });
    }
}

impl Notifier for RecordingNotifier {
    fn notify_success(&self, message: &str) {
        self.record(NotificationKind::Success, message);
    }

    fn notify_failure(&self, message: &str) {
        self.record(NotificationKind::Failure, message);
    }
}
