//! Task domain model.
//!
//! # Responsibility
//! - Define the task row shape mirrored from the `tasks` table.
//! - Define write models (`NewTask`, `TaskPatch`) with normalization.
//!
//! # Invariants
//! - Every task has exactly one owner (`user_id`).
//! - `id`, `created_at` and `updated_at` are assigned by the store.
//! - Recurring + completed tasks are reset to incomplete once per calendar day.

use crate::model::validation::{normalize_color, require_text, ModelValidationError};
use crate::model::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned task identifier.
pub type TaskId = Uuid;

/// Color applied to tasks created without an explicit choice.
pub const DEFAULT_TASK_COLOR: &str = "#3B82F6";

/// Palette offered by the task color picker.
pub const TASK_COLOR_PALETTE: [&str; 12] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#06B6D4", "#F97316", "#EC4899",
    "#84CC16", "#6366F1", "#14B8A6", "#F43F5E",
];

/// One to-do row owned by a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub text: String,
    pub completed: bool,
    /// `#RRGGBB` display color.
    pub color: String,
    /// Free-text notes attached to the task.
    pub notes: String,
    pub is_recurring: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Task {
    /// Returns whether the daily recurring reset applies to this task.
    pub fn needs_daily_reset(&self) -> bool {
        self.is_recurring && self.completed
    }

    /// Merges a validated patch into this row.
    pub fn apply_patch(&mut self, patch: &TaskPatch, updated_at: i64) {
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(is_recurring) = patch.is_recurring {
            self.is_recurring = is_recurring;
        }
        self.updated_at = updated_at;
    }
}

/// Insert payload for a task. The store assigns the id; timestamps come from the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub text: String,
    pub completed: bool,
    pub color: String,
    pub notes: String,
    pub is_recurring: bool,
}

impl NewTask {
    /// Creates an incomplete, non-recurring task with the default color.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
            color: DEFAULT_TASK_COLOR.to_string(),
            notes: String::new(),
            is_recurring: false,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn recurring(mut self, is_recurring: bool) -> Self {
        self.is_recurring = is_recurring;
        self
    }

    /// Returns a trimmed copy with an upper-case color.
    ///
    /// # Errors
    /// - `EmptyTaskText` when text is blank.
    /// - `InvalidColor` when color is not `#RRGGBB`.
    pub fn normalized(&self) -> Result<Self, ModelValidationError> {
        Ok(Self {
            text: require_text(&self.text, ModelValidationError::EmptyTaskText)?,
            completed: self.completed,
            color: normalize_color(&self.color)?,
            notes: self.notes.clone(),
            is_recurring: self.is_recurring,
        })
    }
}

/// Partial update for a task. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub color: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn recurring(is_recurring: bool) -> Self {
        Self {
            is_recurring: Some(is_recurring),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.completed.is_none()
            && self.color.is_none()
            && self.notes.is_none()
            && self.is_recurring.is_none()
    }

    /// Returns a normalized copy, rejecting empty patches and bad fields.
    pub fn normalized(&self) -> Result<Self, ModelValidationError> {
        if self.is_empty() {
            return Err(ModelValidationError::EmptyPatch);
        }

        let text = match &self.text {
            Some(value) => Some(require_text(value, ModelValidationError::EmptyTaskText)?),
            None => None,
        };
        let color = match &self.color {
            Some(value) => Some(normalize_color(value)?),
            None => None,
        };

        Ok(Self {
            text,
            completed: self.completed,
            color,
            notes: self.notes.clone(),
            is_recurring: self.is_recurring,
        })
    }
}
