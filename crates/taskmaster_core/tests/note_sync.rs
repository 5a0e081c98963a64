use std::sync::{Arc, Mutex};
use taskmaster_core::db::SharedConnection;
use taskmaster_core::{
    open_shared_in_memory, ManualClock, NewNote, NoteRepository, NoteSync, NotePatch,
    NotificationPermission, Notifier, NotifyError, ReminderNotification, ReminderState,
    ScanReport, SqliteNoteRepository, SyncError, UserId,
};
use uuid::Uuid;

const NOW: i64 = 1_772_323_200_000;

struct RecordingNotifier {
    permission: NotificationPermission,
    fail: bool,
    shown: Mutex<Vec<ReminderNotification>>,
}

impl RecordingNotifier {
    fn with_permission(permission: NotificationPermission) -> Self {
        Self {
            permission,
            fail: false,
            shown: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_permission(NotificationPermission::Granted)
        }
    }

    fn shown(&self) -> Vec<ReminderNotification> {
        self.shown.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn request_permission(&self) -> NotificationPermission {
        self.permission
    }

    fn show(&self, notification: &ReminderNotification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError("host refused".to_string()));
        }
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn note_sync(
    conn: &SharedConnection,
    owner: UserId,
    clock: Arc<ManualClock>,
) -> NoteSync<SqliteNoteRepository> {
    let mut sync = NoteSync::new(owner, SqliteNoteRepository::new(conn.clone()), clock);
    sync.load().unwrap();
    sync
}

#[test]
fn due_reminder_is_notified_once_and_marked_triggered() {
    let conn = open_shared_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(NOW));
    let mut sync = note_sync(&conn, owner, clock);
    let notifier = RecordingNotifier::with_permission(NotificationPermission::Granted);

    let note = sync
        .create(&NewNote::new("Standup", "Bring the release checklist").with_reminder(NOW - 1_000))
        .unwrap();
    assert!(!note.reminder_triggered);
    assert_eq!(sync.due_notes(NOW).len(), 1);

    let report = sync.scan_due_reminders(&notifier);
    assert_eq!(
        report,
        ScanReport {
            due: 1,
            attempted: 1,
            delivered: 1,
            suppressed: 0,
            marked: 1,
            failed: 0,
        }
    );

    let shown = notifier.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].note_id, note.id);
    assert_eq!(shown[0].title, "TaskMaster Reminder");
    assert_eq!(shown[0].body, "Standup: Bring the release checklist...");

    assert!(sync.get(note.id).unwrap().reminder_triggered);
    let stored = SqliteNoteRepository::new(conn.clone())
        .get_note(owner, note.id)
        .unwrap()
        .unwrap();
    assert!(stored.reminder_triggered);

    let again = sync.scan_due_reminders(&notifier);
    assert_eq!(again.due, 0);
    assert_eq!(notifier.shown().len(), 1);
}

#[test]
fn reminder_at_exactly_now_is_due() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));
    sync.create(&NewNote::new("Edge", "on time").with_reminder(NOW))
        .unwrap();
    assert_eq!(sync.due_notes(NOW).len(), 1);
    assert!(sync.due_notes(NOW - 1).is_empty());
}

#[test]
fn notes_without_reminder_are_never_due() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));
    let notifier = RecordingNotifier::with_permission(NotificationPermission::Granted);

    let note = sync.create(&NewNote::new("Ideas", "no deadline")).unwrap();
    assert_eq!(note.reminder_state(), ReminderState::None);
    assert!(sync.due_notes(i64::MAX).is_empty());
    assert!(sync.upcoming_reminders(0).is_empty());

    assert_eq!(sync.scan_due_reminders(&notifier), ScanReport::default());
    assert!(notifier.shown().is_empty());
}

#[test]
fn future_reminder_fires_after_clock_passes_it() {
    let conn = open_shared_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(NOW));
    let mut sync = note_sync(&conn, Uuid::new_v4(), clock.clone());
    let notifier = RecordingNotifier::with_permission(NotificationPermission::Granted);

    sync.create(&NewNote::new("Call", "dentist").with_reminder(NOW + 60_000))
        .unwrap();
    assert_eq!(sync.scan_due_reminders(&notifier).due, 0);

    clock.advance_ms(60_000);
    assert_eq!(sync.scan_due_reminders(&notifier).marked, 1);
    assert_eq!(notifier.shown().len(), 1);
}

#[test]
fn upcoming_reminders_are_sorted_soonest_first() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));

    let later = sync
        .create(&NewNote::new("Later", "b").with_reminder(NOW + 7_200_000))
        .unwrap();
    let sooner = sync
        .create(&NewNote::new("Sooner", "a").with_reminder(NOW + 60_000))
        .unwrap();
    sync.create(&NewNote::new("Past", "c").with_reminder(NOW - 1))
        .unwrap();
    sync.create(&NewNote::new("Plain", "d")).unwrap();

    let upcoming: Vec<Uuid> = sync
        .upcoming_reminders(NOW)
        .iter()
        .map(|note| note.id)
        .collect();
    assert_eq!(upcoming, vec![sooner.id, later.id]);
}

#[test]
fn trigger_flag_is_monotonic() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));
    let notifier = RecordingNotifier::with_permission(NotificationPermission::Granted);

    let note = sync
        .create(&NewNote::new("Pay rent", "transfer").with_reminder(NOW - 10))
        .unwrap();
    sync.scan_due_reminders(&notifier);

    let rearm = NotePatch {
        reminder_triggered: Some(false),
        ..NotePatch::default()
    };
    let stored = sync.update(note.id, &rearm).unwrap();
    assert!(stored.reminder_triggered);

    let moved = sync
        .update(note.id, &NotePatch::reschedule(Some(NOW + 60_000)))
        .unwrap();
    assert_eq!(moved.reminder_at, Some(NOW + 60_000));
    assert_eq!(
        moved.reminder_state(),
        ReminderState::Triggered { at: NOW + 60_000 }
    );
    assert!(sync.due_notes(NOW + 120_000).is_empty());
}

#[test]
fn reschedule_to_none_clears_reminder() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));

    let note = sync
        .create(&NewNote::new("Gym", "legs").with_reminder(NOW + 1_000))
        .unwrap();
    let cleared = sync.update(note.id, &NotePatch::reschedule(None)).unwrap();
    assert_eq!(cleared.reminder_at, None);
    assert_eq!(sync.get(note.id).unwrap().reminder_state(), ReminderState::None);
}

#[test]
fn denied_permission_suppresses_notification_but_still_marks() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));
    let notifier = RecordingNotifier::with_permission(NotificationPermission::Denied);

    let note = sync
        .create(&NewNote::new("Quiet", "no popups").with_reminder(NOW))
        .unwrap();
    let report = sync.scan_due_reminders(&notifier);

    assert_eq!(report.attempted, 0);
    assert_eq!(report.suppressed, 1);
    assert_eq!(report.marked, 1);
    assert!(notifier.shown().is_empty());
    assert!(sync.get(note.id).unwrap().reminder_triggered);
}

#[test]
fn failed_delivery_is_not_retried() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));
    let notifier = RecordingNotifier::failing();

    sync.create(&NewNote::new("Flaky", "host").with_reminder(NOW))
        .unwrap();
    let report = sync.scan_due_reminders(&notifier);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.marked, 1);

    assert_eq!(sync.scan_due_reminders(&notifier).due, 0);
}

#[test]
fn notes_are_isolated_between_owners() {
    let conn = open_shared_in_memory().unwrap();
    let clock = Arc::new(ManualClock::new(NOW));
    let mut alice = note_sync(&conn, Uuid::new_v4(), clock.clone());
    let note = alice
        .create(&NewNote::new("Secret", "alice only").with_reminder(NOW))
        .unwrap();

    let mut bob = note_sync(&conn, Uuid::new_v4(), clock);
    assert!(bob.notes().is_empty());

    let err = bob.update(note.id, &NotePatch::mark_triggered()).unwrap_err();
    assert!(matches!(err, SyncError::NotFound(id) if id == note.id));
    assert!(!bob.delete(note.id).unwrap());

    alice.refresh().unwrap();
    assert_eq!(alice.notes(), &[note]);
}

#[test]
fn note_timestamps_follow_the_injected_clock() {
    let conn = open_shared_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(NOW));
    let mut sync = note_sync(&conn, owner, clock.clone());

    let note = sync.create(&NewNote::new("Draft", "outline")).unwrap();
    assert_eq!((note.created_at, note.updated_at), (NOW, NOW));

    clock.advance_ms(30_000);
    let edited = sync
        .update(note.id, &NotePatch::reschedule(Some(NOW + 90_000)))
        .unwrap();
    assert_eq!(edited.created_at, NOW);
    assert_eq!(edited.updated_at, NOW + 30_000);

    let fresh = note_sync(&conn, owner, clock);
    assert_eq!(fresh.get(note.id), Some(&edited));
}

#[test]
fn fetch_mirrors_the_stored_note() {
    let conn = open_shared_in_memory().unwrap();
    let owner = Uuid::new_v4();
    let clock = Arc::new(ManualClock::new(NOW));
    let mut reader = note_sync(&conn, owner, clock.clone());
    let mut writer = note_sync(&conn, owner, clock);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    reader.attach_change_signal(tx);

    let note = writer
        .create(&NewNote::new("Groceries", "eggs").with_reminder(NOW))
        .unwrap();
    let fetched = reader.fetch(note.id).unwrap().unwrap();
    assert_eq!(fetched, note);
    assert_eq!(reader.due_notes(NOW).len(), 1);
    assert!(rx.try_recv().is_ok());

    writer.delete(note.id).unwrap();
    assert_eq!(reader.fetch(note.id).unwrap(), None);
    assert!(reader.notes().is_empty());
}

#[test]
fn blank_title_is_rejected() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));
    let err = sync.create(&NewNote::new("  ", "body")).unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
    assert!(sync.notes().is_empty());
}

#[test]
fn successful_mutations_ping_change_signal() {
    let conn = open_shared_in_memory().unwrap();
    let mut sync = note_sync(&conn, Uuid::new_v4(), Arc::new(ManualClock::new(NOW)));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    sync.attach_change_signal(tx);

    let note = sync.create(&NewNote::new("Ping", "pong")).unwrap();
    assert!(rx.try_recv().is_ok());

    assert!(sync.create(&NewNote::new("", "pong")).is_err());
    assert!(rx.try_recv().is_err());

    sync.delete(note.id).unwrap();
    assert!(rx.try_recv().is_ok());
    assert!(!sync.delete(note.id).unwrap());
    assert!(rx.try_recv().is_err());
}
