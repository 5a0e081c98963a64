//! Note collection sync and reminder scanning for one signed-in user.
//!
//! # Responsibility
//! - Load, create, update and delete the owner's note rows.
//! - Detect due reminders, notify, and mark them triggered.
//! - Signal collection changes so the poller can rescan.
//!
//! # Invariants
//! - A note is due only with `reminder_at <= now` and `reminder_triggered == false`.
//! - Each due note is marked triggered through the normal update path, even
//!   when the notification could not be shown.
//! - Two concurrent scans may both notify for the same note; the trigger flag
//!   is the only dedup.

use crate::clock::Clock;
use crate::config::ReminderConfig;
use crate::model::note::{NewNote, Note, NoteId, NotePatch};
use crate::model::UserId;
use crate::notify::{NotificationPermission, Notifier, ReminderNotification};
use crate::repo::note_repo::NoteRepository;
use crate::sync::{logged, SyncError, SyncResult};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

const MODULE: &str = "note_sync";

/// Counters from one reminder scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Notes due at scan time.
    pub due: usize,
    /// `show` calls made.
    pub attempted: usize,
    /// `show` calls that succeeded.
    pub delivered: usize,
    /// Due notes not shown because permission was not granted.
    pub suppressed: usize,
    /// Notes marked triggered in the store.
    pub marked: usize,
    /// Notes whose trigger update failed; they stay due for the next scan.
    pub failed: usize,
}

/// Local mirror of one user's notes.
pub struct NoteSync<R: NoteRepository> {
    owner: UserId,
    repo: R,
    clock: Arc<dyn Clock>,
    reminders: ReminderConfig,
    notes: Vec<Note>,
    loading: bool,
    change_tx: Option<UnboundedSender<()>>,
}

impl<R: NoteRepository> NoteSync<R> {
    pub fn new(owner: UserId, repo: R, clock: Arc<dyn Clock>) -> Self {
        Self::with_reminder_config(owner, repo, clock, ReminderConfig::default())
    }

    pub fn with_reminder_config(
        owner: UserId,
        repo: R,
        clock: Arc<dyn Clock>,
        reminders: ReminderConfig,
    ) -> Self {
        Self {
            owner,
            repo,
            clock,
            reminders,
            notes: Vec::new(),
            loading: true,
            change_tx: None,
        }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Notes ordered newest-first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Routes collection-change pings to `tx`; replaces any previous sender.
    pub fn attach_change_signal(&mut self, tx: UnboundedSender<()>) {
        self.change_tx = Some(tx);
    }

    pub fn detach_change_signal(&mut self) {
        self.change_tx = None;
    }

    pub fn load(&mut self) -> SyncResult<usize> {
        let result = self.repo.list_notes(self.owner);
        self.loading = false;

        let result = result.map_err(SyncError::from).map(|notes| {
            self.notes = notes;
            info!(
                "event=notes_load module={} status=ok user_id={} count={}",
                MODULE,
                self.owner,
                self.notes.len()
            );
            self.notes.len()
        });
        if result.is_ok() {
            self.signal_change();
        }
        logged(MODULE, "notes_load", result)
    }

    pub fn refresh(&mut self) -> SyncResult<usize> {
        self.load()
    }

    /// Re-reads one row from the store and mirrors it locally.
    ///
    /// A row the store no longer has is dropped from the local collection.
    pub fn fetch(&mut self, id: NoteId) -> SyncResult<Option<Note>> {
        let result = self
            .repo
            .get_note(self.owner, id)
            .map_err(SyncError::from)
            .map(|stored| {
                self.notes.retain(|note| note.id != id);
                if let Some(note) = &stored {
                    let at = self
                        .notes
                        .iter()
                        .position(|local| local.created_at < note.created_at)
                        .unwrap_or(self.notes.len());
                    self.notes.insert(at, note.clone());
                }
                stored
            });
        if result.is_ok() {
            self.signal_change();
        }
        logged(MODULE, "note_fetch", result)
    }

    /// Inserts a row and prepends the stored result.
    pub fn create(&mut self, note: &NewNote) -> SyncResult<Note> {
        let now = self.clock.now_ms();
        let result = self
            .repo
            .insert_note(self.owner, note, now)
            .map_err(SyncError::from)
            .map(|created| {
                self.notes.insert(0, created.clone());
                info!(
                    "event=note_create module={} status=ok note_id={} has_reminder={}",
                    MODULE,
                    created.id,
                    created.reminder_at.is_some()
                );
                created
            });
        if result.is_ok() {
            self.signal_change();
        }
        logged(MODULE, "note_create", result)
    }

    /// Applies `patch` to the owner's row `id` and mirrors the stored result.
    ///
    /// # Errors
    /// - `NotFound` when `id` is missing or belongs to another owner.
    pub fn update(&mut self, id: NoteId, patch: &NotePatch) -> SyncResult<Note> {
        let now = self.clock.now_ms();
        let result = self
            .repo
            .update_note(self.owner, id, patch, now)
            .map_err(SyncError::from)
            .map(|stored| {
                if let Some(slot) = self.notes.iter_mut().find(|note| note.id == id) {
                    *slot = stored.clone();
                }
                stored
            });
        if result.is_ok() {
            self.signal_change();
        }
        logged(MODULE, "note_update", result)
    }

    /// Deletes the owner's row `id`. Deleting an absent id is not an error.
    pub fn delete(&mut self, id: NoteId) -> SyncResult<bool> {
        let result = self
            .repo
            .delete_note(self.owner, id)
            .map_err(SyncError::from)
            .map(|removed| {
                self.notes.retain(|note| note.id != id);
                removed
            });
        if matches!(result, Ok(true)) {
            self.signal_change();
        }
        logged(MODULE, "note_delete", result)
    }

    /// Notes whose reminder is due at `now_ms`, in collection order.
    pub fn due_notes(&self, now_ms: i64) -> Vec<&Note> {
        self.notes.iter().filter(|note| note.is_due(now_ms)).collect()
    }

    /// Pending reminders after `now_ms`, soonest first.
    pub fn upcoming_reminders(&self, now_ms: i64) -> Vec<&Note> {
        let mut upcoming: Vec<&Note> = self
            .notes
            .iter()
            .filter(|note| note.is_upcoming(now_ms))
            .collect();
        upcoming.sort_by_key(|note| note.reminder_at);
        upcoming
    }

    /// Notifies for every due note and marks each one triggered.
    pub fn scan_due_reminders(&mut self, notifier: &dyn Notifier) -> ScanReport {
        let now = self.clock.now_ms();
        let due: Vec<Note> = self.due_notes(now).into_iter().cloned().collect();
        let mut report = ScanReport {
            due: due.len(),
            ..ScanReport::default()
        };
        if due.is_empty() {
            debug!("event=reminder_scan module={MODULE} status=ok due=0");
            return report;
        }

        let permission = notifier.permission();
        for note in &due {
            if permission == NotificationPermission::Granted {
                report.attempted += 1;
                let notification = ReminderNotification::for_note(
                    note,
                    &self.reminders.notification_title,
                    self.reminders.body_preview_chars,
                );
                match notifier.show(&notification) {
                    Ok(()) => report.delivered += 1,
                    Err(err) => warn!(
                        "event=reminder_notify module={} status=error note_id={} error={}",
                        MODULE, note.id, err
                    ),
                }
            } else {
                report.suppressed += 1;
            }

            match self.update(note.id, &NotePatch::mark_triggered()) {
                Ok(_) => report.marked += 1,
                Err(_) => report.failed += 1,
            }
        }

        info!(
            "event=reminder_scan module={} status=ok due={} attempted={} delivered={} suppressed={} permission={} marked={} failed={}",
            MODULE,
            report.due,
            report.attempted,
            report.delivered,
            report.suppressed,
            permission.as_str(),
            report.marked,
            report.failed
        );
        report
    }

    fn signal_change(&self) {
        if let Some(tx) = &self.change_tx {
            // Receiver is gone once the poller stops; nothing left to wake.
            let _ = tx.send(());
        }
    }
}
