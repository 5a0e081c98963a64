//! TaskMaster command-line driver.
//!
//! # Responsibility
//! - Load config, start logging and open the local row store.
//! - Run one task/note operation per invocation, or watch reminders.
//! - Print results as JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use taskmaster_core::clock::MILLIS_PER_SECOND;
use taskmaster_core::config::CONFIG_FILE_NAME;
use taskmaster_core::db::SharedConnection;
use taskmaster_core::logging::init_from_config;
use taskmaster_core::{
    open_shared, AppConfig, AuthState, AuthUser, Clock, LogNotifier, NewNote, NewTask, NoteSync,
    SessionStores, SqliteMarkerRepository, SqliteNoteRepository, SqliteTaskRepository,
    SyncSession, SystemClock, TaskPatch, TaskSync, UserId,
};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "taskmaster", version, about = "TaskMaster tasks and notes")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Owner id for every row touched by this invocation.
    #[arg(long, global = true, default_value_t = Uuid::nil())]
    user: UserId,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Task operations.
    #[command(subcommand)]
    Tasks(TaskCommand),
    /// Note operations.
    #[command(subcommand)]
    Notes(NoteCommand),
    /// Reminder operations.
    #[command(subcommand)]
    Reminders(ReminderCommand),
    /// Run a sync session and poll reminders until interrupted.
    Watch {
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    /// List tasks newest-first, after the daily recurring reset.
    List,
    /// Print one task as currently stored.
    Show { id: Uuid },
    /// Add a task.
    Add(AddTaskArgs),
    /// Toggle a task's completion flag.
    Toggle { id: Uuid },
    /// Mark a task completed.
    Done { id: Uuid },
    /// Change a task's text.
    Edit { id: Uuid, text: String },
    /// Delete a task.
    Rm { id: Uuid },
    /// Show total/completed/remaining counts.
    Stats,
}

#[derive(Args, Debug)]
struct AddTaskArgs {
    text: String,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    recurring: bool,
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    /// List notes newest-first.
    List,
    /// Print one note as currently stored.
    Show { id: Uuid },
    /// Add a note, optionally with a reminder.
    Add {
        title: String,
        content: String,
        /// Schedule a reminder this many seconds from now.
        #[arg(long)]
        remind_in_secs: Option<i64>,
    },
    /// Delete a note.
    Rm { id: Uuid },
}

#[derive(Subcommand, Debug)]
enum ReminderCommand {
    /// Notify and mark every due reminder once.
    Scan,
    /// List pending reminders, soonest first.
    Upcoming,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    init_from_config(&config.logging).context("starting file logging")?;

    let conn = open_shared(&config.store.path)
        .with_context(|| format!("opening store {}", config.store.path.display()))?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match cli.command {
        Command::Tasks(command) => run_tasks(command, cli.user, &conn, clock, &config),
        Command::Notes(command) => run_notes(command, cli.user, &conn, clock, &config),
        Command::Reminders(command) => run_reminders(command, cli.user, &conn, clock, &config),
        Command::Watch { duration_secs } => {
            run_watch(cli.user, conn, clock, &config, duration_secs).await
        }
    }
}

fn run_tasks(
    command: TaskCommand,
    user: UserId,
    conn: &SharedConnection,
    clock: Arc<dyn Clock>,
    config: &AppConfig,
) -> Result<()> {
    let mut sync = TaskSync::new(
        user,
        SqliteTaskRepository::new(conn.clone()),
        SqliteMarkerRepository::new(conn.clone()),
        clock,
    );
    sync.start_session()?;

    match command {
        TaskCommand::List => print_json(&sync.tasks()),
        TaskCommand::Show { id } => match sync.fetch(id)? {
            Some(task) => print_json(&task),
            None => bail!("no task {id}"),
        },
        TaskCommand::Add(args) => {
            let color = args
                .color
                .unwrap_or_else(|| config.tasks.default_color.clone());
            let task = NewTask::new(args.text)
                .with_color(color)
                .with_notes(args.notes.unwrap_or_default())
                .recurring(args.recurring);
            print_json(&sync.create(&task)?)
        }
        TaskCommand::Toggle { id } => print_json(&sync.toggle_completed(id)?),
        TaskCommand::Done { id } => print_json(&sync.update(id, &TaskPatch::completed(true))?),
        TaskCommand::Edit { id, text } => {
            let patch = TaskPatch {
                text: Some(text),
                ..TaskPatch::default()
            };
            print_json(&sync.update(id, &patch)?)
        }
        TaskCommand::Rm { id } => print_json(&json!({ "id": id, "deleted": sync.delete(id)? })),
        TaskCommand::Stats => {
            let stats = sync.stats();
            print_json(&json!({
                "total": stats.total,
                "completed": stats.completed,
                "remaining": stats.remaining,
            }))
        }
    }
}

fn note_sync(
    user: UserId,
    conn: &SharedConnection,
    clock: Arc<dyn Clock>,
    config: &AppConfig,
) -> Result<NoteSync<SqliteNoteRepository>> {
    let mut sync = NoteSync::with_reminder_config(
        user,
        SqliteNoteRepository::new(conn.clone()),
        clock,
        config.reminders.clone(),
    );
    sync.load()?;
    Ok(sync)
}

fn run_notes(
    command: NoteCommand,
    user: UserId,
    conn: &SharedConnection,
    clock: Arc<dyn Clock>,
    config: &AppConfig,
) -> Result<()> {
    let now = clock.now_ms();
    let mut sync = note_sync(user, conn, clock, config)?;

    match command {
        NoteCommand::List => print_json(&sync.notes()),
        NoteCommand::Show { id } => match sync.fetch(id)? {
            Some(note) => print_json(&note),
            None => bail!("no note {id}"),
        },
        NoteCommand::Add {
            title,
            content,
            remind_in_secs,
        } => {
            let mut note = NewNote::new(title, content);
            if let Some(secs) = remind_in_secs {
                note = note.with_reminder(reminder_at(now, secs)?);
            }
            print_json(&sync.create(&note)?)
        }
        NoteCommand::Rm { id } => print_json(&json!({ "id": id, "deleted": sync.delete(id)? })),
    }
}

/// Absolute reminder time `secs` seconds after `now`.
fn reminder_at(now: i64, secs: i64) -> Result<i64> {
    if secs < 0 {
        bail!("--remind-in-secs must not be negative");
    }
    match secs
        .checked_mul(MILLIS_PER_SECOND)
        .and_then(|delta| now.checked_add(delta))
    {
        Some(at) => Ok(at),
        None => bail!("--remind-in-secs {secs} is too far in the future"),
    }
}

fn run_reminders(
    command: ReminderCommand,
    user: UserId,
    conn: &SharedConnection,
    clock: Arc<dyn Clock>,
    config: &AppConfig,
) -> Result<()> {
    let now = clock.now_ms();
    let mut sync = note_sync(user, conn, clock, config)?;

    match command {
        ReminderCommand::Scan => {
            let report = sync.scan_due_reminders(&LogNotifier);
            print_json(&json!({
                "due": report.due,
                "attempted": report.attempted,
                "delivered": report.delivered,
                "suppressed": report.suppressed,
                "marked": report.marked,
                "failed": report.failed,
            }))
        }
        ReminderCommand::Upcoming => print_json(&sync.upcoming_reminders(now)),
    }
}

async fn run_watch(
    user: UserId,
    conn: SharedConnection,
    clock: Arc<dyn Clock>,
    config: &AppConfig,
    duration_secs: Option<u64>,
) -> Result<()> {
    let mut auth = AuthState::new();
    auth.sign_in(AuthUser::new(user, "local", clock.now_ms()));
    let Some(current) = auth.current_user() else {
        bail!("no signed-in user");
    };

    let stores = SessionStores {
        tasks: SqliteTaskRepository::new(conn.clone()),
        notes: SqliteNoteRepository::new(conn.clone()),
        markers: SqliteMarkerRepository::new(conn),
    };
    let session = SyncSession::start(current, stores, clock, Arc::new(LogNotifier), config);
    for err in session.start_errors() {
        eprintln!("warning: {err}");
    }
    let confirmed = if current.is_email_confirmed() {
        "confirmed"
    } else {
        "unconfirmed"
    };
    eprintln!(
        "watching reminders for {} ({} email {}) every {}s; Ctrl-C to stop",
        session.user_id(),
        confirmed,
        current.email,
        config.reminders.poll_interval_secs
    );

    match duration_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl-C")?,
    }

    session.end().await;
    auth.sign_out();
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
