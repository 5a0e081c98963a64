//! Client-side synchronization of task/note collections.
//!
//! # Responsibility
//! - Mirror the signed-in user's rows into local collections.
//! - Run the daily recurring-task reset and the reminder scan.
//! - Own the poller lifecycle for one signed-in session.
//!
//! # Invariants
//! - Local state changes only after the store acknowledges a write.
//! - A failed write leaves local state untouched, is logged, and is returned.
//! - Every store call is scoped to the session owner.

pub mod note_sync;
pub mod reminder_poller;
pub mod session;
pub mod task_sync;

use crate::model::validation::ModelValidationError;
use crate::repo::RepoError;
use log::error;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type SyncResult<T> = Result<T, SyncError>;

/// Error reported to callers of sync operations.
#[derive(Debug)]
pub enum SyncError {
    /// Payload rejected before reaching the store.
    Validation(ModelValidationError),
    /// No row with this id exists for the session owner.
    NotFound(Uuid),
    /// Store call failed.
    Repo(RepoError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "row not found for current user: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl SyncError {
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::Repo(_) => "store_failed",
        }
    }
}

/// Logs a failed operation and passes the result through unchanged.
pub(crate) fn logged<T>(
    module: &'static str,
    event: &'static str,
    result: SyncResult<T>,
) -> SyncResult<T> {
    if let Err(err) = &result {
        error!(
            "event={} module={} status=error error_code={} error={}",
            event,
            module,
            err.code(),
            err
        );
    }
    result
}
