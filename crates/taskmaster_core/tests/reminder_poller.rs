use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskmaster_core::{
    open_shared_in_memory, ManualClock, NewNote, NoteSync, NotificationPermission, Notifier,
    NotifyError, ReminderNotification, ReminderPoller, SqliteNoteRepository,
};
use uuid::Uuid;

const NOW: i64 = 1_772_323_200_000;
const INTERVAL: Duration = Duration::from_secs(30);

struct RecordingNotifier {
    permission: Mutex<NotificationPermission>,
    requests: AtomicUsize,
    shown: Mutex<Vec<ReminderNotification>>,
}

impl RecordingNotifier {
    fn new(permission: NotificationPermission) -> Arc<Self> {
        Arc::new(Self {
            permission: Mutex::new(permission),
            requests: AtomicUsize::new(0),
            shown: Mutex::new(Vec::new()),
        })
    }

    fn shown_count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap()
    }

    fn request_permission(&self) -> NotificationPermission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut permission = self.permission.lock().unwrap();
        *permission = NotificationPermission::Granted;
        *permission
    }

    fn show(&self, notification: &ReminderNotification) -> Result<(), NotifyError> {
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn shared_notes(clock: Arc<ManualClock>) -> Arc<Mutex<NoteSync<SqliteNoteRepository>>> {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = NoteSync::new(Uuid::new_v4(), SqliteNoteRepository::new(conn), clock);
    sync.load().unwrap();
    Arc::new(Mutex::new(sync))
}

fn add_note(notes: &Mutex<NoteSync<SqliteNoteRepository>>, reminder_at: i64) {
    notes
        .lock()
        .unwrap()
        .create(&NewNote::new("Reminder", "body").with_reminder(reminder_at))
        .unwrap();
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn first_scan_runs_immediately_on_start() {
    let clock = Arc::new(ManualClock::new(NOW));
    let notes = shared_notes(clock);
    add_note(&notes, NOW - 5_000);
    let notifier = RecordingNotifier::new(NotificationPermission::Granted);

    let poller = ReminderPoller::spawn(notes.clone(), notifier.clone(), INTERVAL);
    settle().await;

    assert_eq!(notifier.shown_count(), 1);
    assert!(notes.lock().unwrap().notes()[0].reminder_triggered);
    assert!(poller.is_running());
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn periodic_tick_picks_up_reminders_that_became_due() {
    let clock = Arc::new(ManualClock::new(NOW));
    let notes = shared_notes(clock.clone());
    add_note(&notes, NOW + 45_000);
    let notifier = RecordingNotifier::new(NotificationPermission::Granted);

    let poller = ReminderPoller::spawn(notes.clone(), notifier.clone(), INTERVAL);
    settle().await;
    assert_eq!(notifier.shown_count(), 0);

    clock.advance_ms(45_000);
    tokio::time::sleep(INTERVAL).await;
    assert_eq!(notifier.shown_count(), 1);

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(notifier.shown_count(), 1);
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn collection_change_triggers_rescan_before_next_tick() {
    let clock = Arc::new(ManualClock::new(NOW));
    let notes = shared_notes(clock);
    let notifier = RecordingNotifier::new(NotificationPermission::Granted);

    let poller = ReminderPoller::spawn(notes.clone(), notifier.clone(), INTERVAL);
    settle().await;
    assert_eq!(notifier.shown_count(), 0);

    add_note(&notes, NOW);
    settle().await;
    assert_eq!(notifier.shown_count(), 1);
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn request_scan_runs_out_of_schedule() {
    let clock = Arc::new(ManualClock::new(NOW));
    let notes = shared_notes(clock.clone());
    add_note(&notes, NOW + 10_000);
    let notifier = RecordingNotifier::new(NotificationPermission::Granted);

    let poller = ReminderPoller::spawn(notes.clone(), notifier.clone(), INTERVAL);
    settle().await;

    clock.advance_ms(10_000);
    poller.request_scan();
    settle().await;
    assert_eq!(notifier.shown_count(), 1);
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn undecided_permission_is_requested_once_on_start() {
    let clock = Arc::new(ManualClock::new(NOW));
    let notes = shared_notes(clock);
    add_note(&notes, NOW);
    let notifier = RecordingNotifier::new(NotificationPermission::Default);

    let poller = ReminderPoller::spawn(notes.clone(), notifier.clone(), INTERVAL);
    settle().await;
    tokio::time::sleep(INTERVAL).await;

    assert_eq!(notifier.requests.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.shown_count(), 1);
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn granted_permission_is_not_requested_again() {
    let notes = shared_notes(Arc::new(ManualClock::new(NOW)));
    let notifier = RecordingNotifier::new(NotificationPermission::Granted);

    let poller = ReminderPoller::spawn(notes, notifier.clone(), INTERVAL);
    settle().await;
    assert_eq!(notifier.requests.load(Ordering::SeqCst), 0);
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn no_scans_after_stop() {
    let clock = Arc::new(ManualClock::new(NOW));
    let notes = shared_notes(clock);
    let notifier = RecordingNotifier::new(NotificationPermission::Granted);

    let poller = ReminderPoller::spawn(notes.clone(), notifier.clone(), INTERVAL);
    settle().await;
    poller.stop().await;

    add_note(&notes, NOW);
    tokio::time::sleep(INTERVAL * 2).await;

    assert_eq!(notifier.shown_count(), 0);
    assert!(!notes.lock().unwrap().notes()[0].reminder_triggered);
}

/// Notifier whose `show` blocks the calling thread, like a synchronous host API.
struct SlowNotifier {
    delay: Duration,
    shown: AtomicUsize,
}

impl Notifier for SlowNotifier {
    fn permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn request_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show(&self, _notification: &ReminderNotification) -> Result<(), NotifyError> {
        std::thread::sleep(self.delay);
        self.shown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn slow_notifier_does_not_stall_other_tasks() {
    let clock = Arc::new(ManualClock::new(NOW));
    let notes = shared_notes(clock);
    for _ in 0..3 {
        add_note(&notes, NOW - 1_000);
    }
    let notifier = Arc::new(SlowNotifier {
        delay: Duration::from_millis(200),
        shown: AtomicUsize::new(0),
    });

    let started = std::time::Instant::now();
    let poller = ReminderPoller::spawn(notes.clone(), notifier.clone(), INTERVAL);
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(started.elapsed() < Duration::from_millis(300));

    poller.stop().await;
    assert_eq!(notifier.shown.load(Ordering::SeqCst), 3);
    assert!(notes
        .lock()
        .unwrap()
        .notes()
        .iter()
        .all(|note| note.reminder_triggered));
}
