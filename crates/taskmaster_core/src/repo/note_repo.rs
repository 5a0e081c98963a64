//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD over the `notes` table.
//!
//! # Invariants
//! - Lists are ordered newest-first (`created_at DESC`, insertion order tie-break).
//! - `reminder_triggered` is never cleared by an update (`MAX` merge in SQL).
//! - New notes always start with `reminder_triggered = 0`.
//! - Timestamps come from the caller's `now`, so they follow the injected clock.

use crate::db::SharedConnection;
use crate::model::note::{NewNote, Note, NoteId, NotePatch};
use crate::model::UserId;
use crate::repo::{
    bool_to_int, lock_conn, parse_flag, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    content,
    reminder_at,
    reminder_triggered,
    created_at,
    updated_at
FROM notes";

/// Repository interface for note rows of one owner at a time.
pub trait NoteRepository {
    fn list_notes(&self, owner: UserId) -> RepoResult<Vec<Note>>;
    fn get_note(&self, owner: UserId, id: NoteId) -> RepoResult<Option<Note>>;
    /// Inserts a row stamped with `now`.
    fn insert_note(&self, owner: UserId, note: &NewNote, now: i64) -> RepoResult<Note>;
    fn update_note(
        &self,
        owner: UserId,
        id: NoteId,
        patch: &NotePatch,
        now: i64,
    ) -> RepoResult<Note>;
    /// Returns whether a row was removed.
    fn delete_note(&self, owner: UserId, id: NoteId) -> RepoResult<bool>;
}

/// SQLite-backed note repository.
#[derive(Clone)]
pub struct SqliteNoteRepository {
    conn: SharedConnection,
}

impl SqliteNoteRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn list_notes(&self, owner: UserId) -> RepoResult<Vec<Note>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn get_note(&self, owner: UserId, id: NoteId) -> RepoResult<Option<Note>> {
        let conn = lock_conn(&self.conn)?;
        fetch_note(&conn, owner, id)
    }

    fn insert_note(&self, owner: UserId, note: &NewNote, now: i64) -> RepoResult<Note> {
        let note = note.normalized()?;
        let id = Uuid::new_v4();
        let conn = lock_conn(&self.conn)?;

        conn.execute(
            "INSERT INTO notes (
                id,
                user_id,
                title,
                content,
                reminder_at,
                reminder_triggered,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6);",
            params![
                id.to_string(),
                owner.to_string(),
                note.title.as_str(),
                note.content.as_str(),
                note.reminder_at,
                now,
            ],
        )?;

        fetch_note(&conn, owner, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted note {id} missing in read-back"))
        })
    }

    fn update_note(
        &self,
        owner: UserId,
        id: NoteId,
        patch: &NotePatch,
        now: i64,
    ) -> RepoResult<Note> {
        let patch = patch.normalized()?;
        let conn = lock_conn(&self.conn)?;

        let changed = conn.execute(
            "UPDATE notes
             SET
                title = COALESCE(?3, title),
                content = COALESCE(?4, content),
                reminder_at = CASE WHEN ?5 = 1 THEN ?6 ELSE reminder_at END,
                reminder_triggered = MAX(reminder_triggered, COALESCE(?7, 0)),
                updated_at = ?8
             WHERE id = ?1
               AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                patch.title.as_deref(),
                patch.content.as_deref(),
                bool_to_int(patch.reminder_at.is_some()),
                patch.reminder_at.flatten(),
                patch.reminder_triggered.map(bool_to_int),
                now,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        fetch_note(&conn, owner, id)?.ok_or(RepoError::NotFound(id))
    }

    fn delete_note(&self, owner: UserId, id: NoteId) -> RepoResult<bool> {
        let conn = lock_conn(&self.conn)?;
        let changed = conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        Ok(changed > 0)
    }
}

fn fetch_note(conn: &Connection, owner: UserId, id: NoteId) -> RepoResult<Option<Note>> {
    let mut stmt = conn.prepare(&format!(
        "{NOTE_SELECT_SQL}
         WHERE id = ?1
           AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_note_row(row)?));
    }
    Ok(None)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id_text: String = row.get("id")?;
    let owner_text: String = row.get("user_id")?;

    Ok(Note {
        id: parse_uuid(&id_text, "notes.id")?,
        user_id: parse_uuid(&owner_text, "notes.user_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        reminder_at: row.get("reminder_at")?,
        reminder_triggered: parse_flag(
            row.get("reminder_triggered")?,
            "notes.reminder_triggered",
        )?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
