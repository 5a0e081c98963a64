//! User-facing notification capability.
//!
//! # Responsibility
//! - Abstract the host notification surface (browser, desktop, log sink).
//! - Build reminder notifications from note rows.
//!
//! # Invariants
//! - Notifications are only shown when permission is `Granted`.
//! - Delivery is best-effort; callers never retry a failed `show`.

use crate::model::note::{Note, NoteId};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default notification title for reminders.
pub const DEFAULT_REMINDER_TITLE: &str = "TaskMaster Reminder";
/// Default number of content characters included in a reminder body.
pub const DEFAULT_BODY_PREVIEW_CHARS: usize = 100;

/// Host permission state for showing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    /// User has not been asked yet.
    Default,
    Granted,
    Denied,
    /// The host has no notification capability at all.
    Unsupported,
}

impl NotificationPermission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Notification delivery failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.0)
    }
}

impl Error for NotifyError {}

/// One reminder notification ready to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotification {
    pub note_id: NoteId,
    pub title: String,
    pub body: String,
}

impl ReminderNotification {
    /// Builds `"{note title}: {content preview}..."` under `title`.
    pub fn for_note(note: &Note, title: &str, preview_chars: usize) -> Self {
        let preview: String = note.content.chars().take(preview_chars).collect();
        Self {
            note_id: note.id,
            title: title.to_string(),
            body: format!("{}: {}...", note.title, preview),
        }
    }
}

/// Host notification surface.
pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;
    /// Prompts for permission when the host supports it; returns the outcome.
    fn request_permission(&self) -> NotificationPermission;
    fn show(&self, notification: &ReminderNotification) -> Result<(), NotifyError>;
}

/// Notifier that writes reminders to the log; always granted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show(&self, notification: &ReminderNotification) -> Result<(), NotifyError> {
        info!(
            "event=reminder_notify module=notify status=ok note_id={}",
            notification.note_id
        );
        Ok(())
    }
}
