//! Note domain model with optional reminder.
//!
//! # Responsibility
//! - Define the note row shape mirrored from the `notes` table.
//! - Derive the reminder state machine from row fields.
//!
//! # Invariants
//! - `reminder_triggered` only moves from `false` to `true`.
//! - A note without `reminder_at` is never due.
//! - Reminder times are epoch milliseconds.

use crate::model::validation::{require_text, ModelValidationError};
use crate::model::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned note identifier.
pub type NoteId = Uuid;

/// One note row owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    /// Epoch milliseconds. `None` means no reminder.
    pub reminder_at: Option<i64>,
    pub reminder_triggered: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Reminder lifecycle derived from a note.
///
/// `None -> Pending -> Triggered`; the last step is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    None,
    Pending { at: i64 },
    Triggered { at: i64 },
}

impl Note {
    pub fn reminder_state(&self) -> ReminderState {
        match (self.reminder_at, self.reminder_triggered) {
            (None, _) => ReminderState::None,
            (Some(at), false) => ReminderState::Pending { at },
            (Some(at), true) => ReminderState::Triggered { at },
        }
    }

    /// Returns whether this note should fire a reminder at `now_ms`.
    pub fn is_due(&self, now_ms: i64) -> bool {
        matches!(self.reminder_state(), ReminderState::Pending { at } if at <= now_ms)
    }

    /// Returns whether this note has a pending reminder strictly after `now_ms`.
    pub fn is_upcoming(&self, now_ms: i64) -> bool {
        matches!(self.reminder_state(), ReminderState::Pending { at } if at > now_ms)
    }

    /// Merges a validated patch into this row.
    ///
    /// The trigger flag is OR-ed so a stale patch can never re-arm a reminder.
    pub fn apply_patch(&mut self, patch: &NotePatch, updated_at: i64) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(reminder_at) = patch.reminder_at {
            self.reminder_at = reminder_at;
        }
        if let Some(triggered) = patch.reminder_triggered {
            self.reminder_triggered = self.reminder_triggered || triggered;
        }
        self.updated_at = updated_at;
    }
}

/// Insert payload for a note. The store assigns the id; timestamps come from the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub reminder_at: Option<i64>,
}

impl NewNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            reminder_at: None,
        }
    }

    pub fn with_reminder(mut self, reminder_at: i64) -> Self {
        self.reminder_at = Some(reminder_at);
        self
    }

    /// Returns a trimmed copy.
    ///
    /// # Errors
    /// - `EmptyNoteTitle` / `EmptyNoteContent` when either is blank.
    pub fn normalized(&self) -> Result<Self, ModelValidationError> {
        Ok(Self {
            title: require_text(&self.title, ModelValidationError::EmptyNoteTitle)?,
            content: require_text(&self.content, ModelValidationError::EmptyNoteContent)?,
            reminder_at: self.reminder_at,
        })
    }
}

/// Partial update for a note.
///
/// `reminder_at: Some(None)` clears the reminder; `None` leaves it untouched.
/// `reminder_triggered: Some(false)` never clears an already-triggered flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub reminder_at: Option<Option<i64>>,
    pub reminder_triggered: Option<bool>,
}

impl NotePatch {
    pub fn mark_triggered() -> Self {
        Self {
            reminder_triggered: Some(true),
            ..Self::default()
        }
    }

    pub fn reschedule(reminder_at: Option<i64>) -> Self {
        Self {
            reminder_at: Some(reminder_at),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.reminder_at.is_none()
            && self.reminder_triggered.is_none()
    }

    pub fn normalized(&self) -> Result<Self, ModelValidationError> {
        if self.is_empty() {
            return Err(ModelValidationError::EmptyPatch);
        }

        let title = match &self.title {
            Some(value) => Some(require_text(value, ModelValidationError::EmptyNoteTitle)?),
            None => None,
        };
        let content = match &self.content {
            Some(value) => Some(require_text(value, ModelValidationError::EmptyNoteContent)?),
            None => None,
        };

        Ok(Self {
            title,
            content,
            reminder_at: self.reminder_at,
            reminder_triggered: self.reminder_triggered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{NewNote, Note, NotePatch, ReminderState};
    use crate::model::validation::ModelValidationError;
    use uuid::Uuid;

    fn note(reminder_at: Option<i64>, triggered: bool) -> Note {
        Note {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Dentist".to_string(),
            content: "Call to confirm".to_string(),
            reminder_at,
            reminder_triggered: triggered,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn reminder_state_follows_fields() {
        assert_eq!(note(None, false).reminder_state(), ReminderState::None);
        assert_eq!(note(None, true).reminder_state(), ReminderState::None);
        assert_eq!(
            note(Some(5), false).reminder_state(),
            ReminderState::Pending { at: 5 }
        );
        assert_eq!(
            note(Some(5), true).reminder_state(),
            ReminderState::Triggered { at: 5 }
        );
    }

    #[test]
    fn due_is_inclusive_of_now_and_ignores_missing_reminder() {
        assert!(note(Some(100), false).is_due(100));
        assert!(note(Some(99), false).is_due(100));
        assert!(!note(Some(101), false).is_due(100));
        assert!(!note(Some(1), true).is_due(100));
        assert!(!note(None, false).is_due(i64::MAX));
    }

    #[test]
    fn upcoming_is_strictly_future_pending() {
        assert!(note(Some(101), false).is_upcoming(100));
        assert!(!note(Some(100), false).is_upcoming(100));
        assert!(!note(Some(101), true).is_upcoming(100));
    }

    #[test]
    fn apply_patch_never_clears_trigger_flag() {
        let mut current = note(Some(5), true);
        let patch = NotePatch {
            reminder_triggered: Some(false),
            ..NotePatch::default()
        };
        current.apply_patch(&patch, 7);
        assert!(current.reminder_triggered);
        assert_eq!(current.updated_at, 7);
    }

    #[test]
    fn reschedule_can_clear_reminder() {
        let mut current = note(Some(5), false);
        current.apply_patch(&NotePatch::reschedule(None), 7);
        assert_eq!(current.reminder_state(), ReminderState::None);
    }

    #[test]
    fn new_note_requires_title_and_content() {
        assert_eq!(
            NewNote::new(" ", "body").normalized().unwrap_err(),
            ModelValidationError::EmptyNoteTitle
        );
        assert_eq!(
            NewNote::new("title", "\n").normalized().unwrap_err(),
            ModelValidationError::EmptyNoteContent
        );
        let normalized = NewNote::new(" title ", " body ").normalized().unwrap();
        assert_eq!(normalized.title, "title");
        assert_eq!(normalized.content, "body");
    }
}
