//! Field validation shared by task/note write models.
//!
//! # Responsibility
//! - Normalize user-entered text before it reaches a repository.
//! - Reject blank text, malformed colors and empty patches.
//!
//! # Invariants
//! - Validation never touches storage; it is a pure function of its input.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex color regex"));

/// Validation failures for task/note write models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Task text is blank after trim.
    EmptyTaskText,
    /// Note title is blank after trim.
    EmptyNoteTitle,
    /// Note content is blank after trim.
    EmptyNoteContent,
    /// Color is not a `#RRGGBB` value.
    InvalidColor(String),
    /// Patch carries no field to update.
    EmptyPatch,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTaskText => write!(f, "task text must not be blank"),
            Self::EmptyNoteTitle => write!(f, "note title must not be blank"),
            Self::EmptyNoteContent => write!(f, "note content must not be blank"),
            Self::InvalidColor(value) => {
                write!(f, "color must be a #RRGGBB hex value, got `{value}`")
            }
            Self::EmptyPatch => write!(f, "update patch has no fields"),
        }
    }
}

impl Error for ModelValidationError {}

/// Returns whether `value` is a `#RRGGBB` hex color.
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Normalizes a color to upper-case `#RRGGBB`.
pub fn normalize_color(value: &str) -> Result<String, ModelValidationError> {
    let trimmed = value.trim();
    if !is_hex_color(trimmed) {
        return Err(ModelValidationError::InvalidColor(trimmed.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

/// Trims `value` and returns `err` when nothing is left.
pub(crate) fn require_text(
    value: &str,
    err: ModelValidationError,
) -> Result<String, ModelValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_string())
}
