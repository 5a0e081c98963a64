//! Domain model for task/note collections.
//!
//! # Responsibility
//! - Define row shapes mirrored from the remote `tasks` and `notes` tables.
//! - Define write models and their normalization rules.
//!
//! # Invariants
//! - Every row is owned by exactly one `UserId`.
//! - Identifiers and timestamps are assigned by the store, never by callers.

pub mod note;
pub mod task;
pub mod user;
pub mod validation;

pub use user::UserId;
