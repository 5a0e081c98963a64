//! Task collection sync for one signed-in user.
//!
//! # Responsibility
//! - Load, create, update and delete the owner's task rows.
//! - Apply the daily recurring-task reset once per calendar day.
//!
//! # Invariants
//! - Local rows are replaced by the store's read-back, never by caller input.
//! - Every write is stamped with the injected clock, so local and stored
//!   timestamps agree.
//! - The reset marker is written only after the bulk reset succeeds, so a
//!   failed reset is retried on the next session start.
//! - The reset is evaluated on demand (session start), not on a timer.

use crate::clock::Clock;
use crate::model::task::{NewTask, Task, TaskId, TaskPatch};
use crate::model::UserId;
use crate::repo::marker_repo::{MarkerRepository, LAST_RESET_DATE_KEY};
use crate::repo::task_repo::TaskRepository;
use crate::sync::{logged, SyncError, SyncResult};
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;

const MODULE: &str = "task_sync";

/// Outcome of the daily recurring reset check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Marker already holds today's date; nothing was written.
    AlreadyDone { day: NaiveDate },
    /// `count` rows were reset and the marker now holds `day`.
    Reset { day: NaiveDate, count: usize },
}

/// Completion counters shown above the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
}

/// Local mirror of one user's tasks.
pub struct TaskSync<R: TaskRepository, M: MarkerRepository> {
    owner: UserId,
    repo: R,
    markers: M,
    clock: Arc<dyn Clock>,
    tasks: Vec<Task>,
    loading: bool,
}

impl<R: TaskRepository, M: MarkerRepository> TaskSync<R, M> {
    pub fn new(owner: UserId, repo: R, markers: M, clock: Arc<dyn Clock>) -> Self {
        Self {
            owner,
            repo,
            markers,
            clock,
            tasks: Vec::new(),
            loading: true,
        }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Tasks ordered newest-first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// True until the initial fetch finishes, whether it succeeded or not.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Loads rows, then runs the daily recurring reset.
    ///
    /// Both steps run even if the first fails; the first error is returned.
    pub fn start_session(&mut self) -> SyncResult<()> {
        let loaded = self.load();
        let reset = self.reset_recurring_if_new_day();
        loaded?;
        reset.map(|_| ())
    }

    /// Replaces the local collection with the owner's rows.
    pub fn load(&mut self) -> SyncResult<usize> {
        let result = self.repo.list_tasks(self.owner);
        self.loading = false;

        let result = result.map_err(SyncError::from).map(|tasks| {
            self.tasks = tasks;
            info!(
                "event=tasks_load module={} status=ok user_id={} count={}",
                MODULE,
                self.owner,
                self.tasks.len()
            );
            self.tasks.len()
        });
        logged(MODULE, "tasks_load", result)
    }

    /// Same as [`TaskSync::load`]; kept for call sites that refresh on demand.
    pub fn refresh(&mut self) -> SyncResult<usize> {
        self.load()
    }

    /// Re-reads one row from the store and mirrors it locally.
    ///
    /// A row the store no longer has is dropped from the local collection.
    pub fn fetch(&mut self, id: TaskId) -> SyncResult<Option<Task>> {
        let result = self
            .repo
            .get_task(self.owner, id)
            .map_err(SyncError::from)
            .map(|stored| {
                self.tasks.retain(|task| task.id != id);
                if let Some(task) = &stored {
                    let at = self
                        .tasks
                        .iter()
                        .position(|local| local.created_at < task.created_at)
                        .unwrap_or(self.tasks.len());
                    self.tasks.insert(at, task.clone());
                }
                stored
            });
        logged(MODULE, "task_fetch", result)
    }

    /// Inserts a row and prepends the stored result.
    pub fn create(&mut self, task: &NewTask) -> SyncResult<Task> {
        let now = self.clock.now_ms();
        let result = self
            .repo
            .insert_task(self.owner, task, now)
            .map_err(SyncError::from)
            .map(|created| {
                self.tasks.insert(0, created.clone());
                info!(
                    "event=task_create module={} status=ok task_id={}",
                    MODULE, created.id
                );
                created
            });
        logged(MODULE, "task_create", result)
    }

    /// Applies `patch` to the owner's row `id` and mirrors the stored result.
    ///
    /// # Errors
    /// - `NotFound` when `id` is missing or belongs to another owner.
    pub fn update(&mut self, id: TaskId, patch: &TaskPatch) -> SyncResult<Task> {
        let now = self.clock.now_ms();
        let result = self
            .repo
            .update_task(self.owner, id, patch, now)
            .map_err(SyncError::from)
            .map(|stored| {
                self.replace_local(stored.clone());
                stored
            });
        logged(MODULE, "task_update", result)
    }

    /// Flips the completion flag of a locally known task.
    pub fn toggle_completed(&mut self, id: TaskId) -> SyncResult<Task> {
        let completed = match self.get(id) {
            Some(task) => task.completed,
            None => return logged(MODULE, "task_toggle", Err(SyncError::NotFound(id))),
        };
        self.update(id, &TaskPatch::completed(!completed))
    }

    /// Deletes the owner's row `id`. Deleting an absent id is not an error.
    ///
    /// Returns whether the store removed a row.
    pub fn delete(&mut self, id: TaskId) -> SyncResult<bool> {
        let result = self
            .repo
            .delete_task(self.owner, id)
            .map_err(SyncError::from)
            .map(|removed| {
                self.tasks.retain(|task| task.id != id);
                removed
            });
        logged(MODULE, "task_delete", result)
    }

    /// Resets completed recurring tasks unless already done today.
    pub fn reset_recurring_if_new_day(&mut self) -> SyncResult<ResetOutcome> {
        let result = self.reset_inner();
        logged(MODULE, "recurring_reset", result)
    }

    pub fn stats(&self) -> TaskStats {
        let completed = self.tasks.iter().filter(|task| task.completed).count();
        TaskStats {
            total: self.tasks.len(),
            completed,
            remaining: self.tasks.len() - completed,
        }
    }

    fn reset_inner(&mut self) -> SyncResult<ResetOutcome> {
        let day = self.clock.today();
        let today = day.to_string();

        let last_reset = self.markers.get_marker(self.owner, LAST_RESET_DATE_KEY)?;
        if last_reset.as_deref() == Some(today.as_str()) {
            return Ok(ResetOutcome::AlreadyDone { day });
        }

        let now = self.clock.now_ms();
        let count = self.repo.reset_completed_recurring(self.owner, now)?;
        let patch = TaskPatch::completed(false);
        for task in self.tasks.iter_mut().filter(|task| task.needs_daily_reset()) {
            task.apply_patch(&patch, now);
        }

        self.markers
            .set_marker(self.owner, LAST_RESET_DATE_KEY, &today, now)?;
        info!(
            "event=recurring_reset module={} status=ok user_id={} day={} reset_count={}",
            MODULE, self.owner, today, count
        );
        Ok(ResetOutcome::Reset { day, count })
    }

    fn replace_local(&mut self, stored: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|task| task.id == stored.id) {
            *slot = stored;
        }
    }
}
