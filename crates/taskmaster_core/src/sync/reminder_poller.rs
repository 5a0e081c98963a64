//! Background reminder scanning for one signed-in session.
//!
//! # Responsibility
//! - Scan once at start, then every poll interval.
//! - Rescan whenever the note collection changes.
//! - Stop cleanly when the session ends.
//!
//! # Invariants
//! - Scans run on the blocking pool; the note lock, store I/O and `Notifier::show`
//!   never occupy a runtime worker.
//! - The note lock is held only for the synchronous scan, never across `.await`.
//! - Queued change signals are coalesced into a single rescan.
//! - After `stop` returns, no further scans run and the change signal is detached.

use crate::notify::{NotificationPermission, Notifier};
use crate::repo::note_repo::NoteRepository;
use crate::sync::note_sync::{NoteSync, ScanReport};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const MODULE: &str = "reminder_poller";
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to a running reminder poll task.
pub struct ReminderPoller {
    rescan_tx: UnboundedSender<()>,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: JoinHandle<()>,
}

impl ReminderPoller {
    /// Starts polling `notes` on the current tokio runtime.
    ///
    /// Asks `notifier` for permission first when the user has not decided yet.
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(
        notes: Arc<Mutex<NoteSync<R>>>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
    ) -> Self
    where
        R: NoteRepository + Send + 'static,
    {
        let (rescan_tx, rescan_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        with_notes(&notes, |sync| sync.attach_change_signal(rescan_tx.clone()));

        if notifier.permission() == NotificationPermission::Default {
            let permission = notifier.request_permission();
            info!(
                "event=notify_permission module={} status=ok permission={}",
                MODULE,
                permission.as_str()
            );
        }

        let period = interval.max(MIN_POLL_INTERVAL);
        let join_handle = tokio::spawn(run(notes, notifier, period, rescan_rx, stop_rx));

        info!(
            "event=poller_start module={} status=ok interval_ms={}",
            MODULE,
            period.as_millis()
        );

        Self {
            rescan_tx,
            stop_tx: Some(stop_tx),
            join_handle,
        }
    }

    /// Queues a scan outside the regular schedule.
    pub fn request_scan(&self) {
        if self.rescan_tx.send(()).is_err() {
            debug!("event=poller_rescan module={MODULE} status=skipped reason=stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.join_handle.is_finished()
    }

    /// Stops the poll task and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Err(err) = self.join_handle.await {
            error!("event=poller_stop module={MODULE} status=error error={err}");
        }
    }
}

async fn run<R>(
    notes: Arc<Mutex<NoteSync<R>>>,
    notifier: Arc<dyn Notifier>,
    period: Duration,
    mut rescan_rx: UnboundedReceiver<()>,
    mut stop_rx: oneshot::Receiver<()>,
) where
    R: NoteRepository + Send + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => break,

            _ = ticker.tick() => {
                drain(&mut rescan_rx);
                scan_blocking(&notes, &notifier, "tick").await;
            }

            signal = rescan_rx.recv() => match signal {
                Some(()) => {
                    drain(&mut rescan_rx);
                    scan_blocking(&notes, &notifier, "change").await;
                }
                None => break,
            },
        }
    }

    with_notes(&notes, |sync| sync.detach_change_signal());
    info!("event=poller_stop module={MODULE} status=ok");
}

fn drain(rescan_rx: &mut UnboundedReceiver<()>) {
    while rescan_rx.try_recv().is_ok() {}
}

async fn scan_blocking<R>(
    notes: &Arc<Mutex<NoteSync<R>>>,
    notifier: &Arc<dyn Notifier>,
    trigger: &'static str,
) -> Option<ScanReport>
where
    R: NoteRepository + Send + 'static,
{
    let notes = Arc::clone(notes);
    let notifier = Arc::clone(notifier);
    match tokio::task::spawn_blocking(move || scan_once(&notes, notifier.as_ref(), trigger)).await
    {
        Ok(report) => report,
        Err(err) => {
            error!("event=poller_scan module={MODULE} status=error trigger={trigger} error={err}");
            None
        }
    }
}

fn scan_once<R: NoteRepository>(
    notes: &Mutex<NoteSync<R>>,
    notifier: &dyn Notifier,
    trigger: &'static str,
) -> Option<ScanReport> {
    let report = with_notes(notes, |sync| sync.scan_due_reminders(notifier))?;
    debug!(
        "event=poller_scan module={} status=ok trigger={} due={} marked={}",
        MODULE, trigger, report.due, report.marked
    );
    Some(report)
}

fn with_notes<R: NoteRepository, T>(
    notes: &Mutex<NoteSync<R>>,
    f: impl FnOnce(&mut NoteSync<R>) -> T,
) -> Option<T> {
    match notes.lock() {
        Ok(mut guard) => Some(f(&mut guard)),
        Err(_) => {
            warn!("event=poller_lock module={MODULE} status=error error=note state lock poisoned");
            None
        }
    }
}
