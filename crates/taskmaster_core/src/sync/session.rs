//! Per-user sync session: both collections plus the reminder poller.
//!
//! # Responsibility
//! - Start sync components when a user signs in.
//! - Stop background work when the user signs out.
//!
//! # Invariants
//! - Startup failures do not abort the session; they are logged and kept in
//!   [`SyncSession::start_errors`], and the affected collection stays empty.
//! - At most one poller runs per session.

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::model::user::AuthUser;
use crate::model::UserId;
use crate::notify::Notifier;
use crate::repo::marker_repo::MarkerRepository;
use crate::repo::note_repo::NoteRepository;
use crate::repo::task_repo::TaskRepository;
use crate::sync::note_sync::NoteSync;
use crate::sync::reminder_poller::ReminderPoller;
use crate::sync::task_sync::TaskSync;
use crate::sync::SyncError;
use log::info;
use std::sync::{Arc, Mutex};

const MODULE: &str = "session";

/// Stores backing one session.
pub struct SessionStores<T, N, M> {
    pub tasks: T,
    pub notes: N,
    pub markers: M,
}

/// Running sync state for one signed-in user.
pub struct SyncSession<T, N, M>
where
    T: TaskRepository,
    N: NoteRepository + Send + 'static,
    M: MarkerRepository,
{
    user_id: UserId,
    tasks: TaskSync<T, M>,
    notes: Arc<Mutex<NoteSync<N>>>,
    poller: Option<ReminderPoller>,
    start_errors: Vec<SyncError>,
}

impl<T, N, M> SyncSession<T, N, M>
where
    T: TaskRepository,
    N: NoteRepository + Send + 'static,
    M: MarkerRepository,
{
    /// Loads both collections, runs the daily reset and starts the poller.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        user: &AuthUser,
        stores: SessionStores<T, N, M>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        let mut start_errors = Vec::new();

        let mut tasks = TaskSync::new(user.id, stores.tasks, stores.markers, Arc::clone(&clock));
        if let Err(err) = tasks.load() {
            start_errors.push(err);
        }
        if let Err(err) = tasks.reset_recurring_if_new_day() {
            start_errors.push(err);
        }

        let mut notes = NoteSync::with_reminder_config(
            user.id,
            stores.notes,
            clock,
            config.reminders.clone(),
        );
        if let Err(err) = notes.load() {
            start_errors.push(err);
        }

        let notes = Arc::new(Mutex::new(notes));
        let poller = ReminderPoller::spawn(
            Arc::clone(&notes),
            notifier,
            config.reminders.poll_interval(),
        );

        info!(
            "event=session_start module={} status={} user_id={} email_confirmed={} errors={}",
            MODULE,
            if start_errors.is_empty() { "ok" } else { "degraded" },
            user.id,
            user.is_email_confirmed(),
            start_errors.len()
        );

        Self {
            user_id: user.id,
            tasks,
            notes,
            poller: Some(poller),
            start_errors,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn tasks(&self) -> &TaskSync<T, M> {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskSync<T, M> {
        &mut self.tasks
    }

    /// Shared note state; lock only for short synchronous sections.
    pub fn notes(&self) -> Arc<Mutex<NoteSync<N>>> {
        Arc::clone(&self.notes)
    }

    pub fn start_errors(&self) -> &[SyncError] {
        &self.start_errors
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(ReminderPoller::is_running)
    }

    /// Queues an out-of-schedule reminder scan.
    pub fn request_scan(&self) {
        if let Some(poller) = &self.poller {
            poller.request_scan();
        }
    }

    /// Stops the poller; call on sign-out.
    pub async fn end(mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        info!(
            "event=session_end module={} status=ok user_id={}",
            MODULE, self.user_id
        );
    }
}
