//! Core data-sync logic for TaskMaster.
//! This crate owns task/note persistence, the daily recurring reset and
//! reminder scanning; hosts only supply a clock, a notifier and a store.

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod sync;

pub use auth::AuthState;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, open_shared, open_shared_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{NewNote, Note, NoteId, NotePatch, ReminderState};
pub use model::task::{NewTask, Task, TaskId, TaskPatch, DEFAULT_TASK_COLOR, TASK_COLOR_PALETTE};
pub use model::user::{AuthUser, UserId};
pub use model::validation::ModelValidationError;
pub use notify::{LogNotifier, NotificationPermission, Notifier, NotifyError, ReminderNotification};
pub use repo::marker_repo::{MarkerRepository, MemoryMarkerRepository, SqliteMarkerRepository};
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use sync::note_sync::{NoteSync, ScanReport};
pub use sync::reminder_poller::ReminderPoller;
pub use sync::session::{SessionStores, SyncSession};
pub use sync::task_sync::{ResetOutcome, TaskStats, TaskSync};
pub use sync::{SyncError, SyncResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
