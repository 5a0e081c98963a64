//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide owner-scoped CRUD over the `tasks` table.
//! - Provide the bulk reset used by the daily recurring-task rule.
//!
//! # Invariants
//! - Lists are ordered newest-first (`created_at DESC`, insertion order tie-break).
//! - `update_task` on a missing or foreign row returns `NotFound` and writes nothing.
//! - `delete_task` on a missing or foreign row is a no-op.
//! - Timestamps come from the caller's `now`, so they follow the injected clock.

use crate::db::SharedConnection;
use crate::model::task::{NewTask, Task, TaskId, TaskPatch};
use crate::model::UserId;
use crate::repo::{
    bool_to_int, lock_conn, parse_flag, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    text,
    completed,
    color,
    notes,
    is_recurring,
    created_at,
    updated_at
FROM tasks";

/// Repository interface for task rows of one owner at a time.
pub trait TaskRepository {
    fn list_tasks(&self, owner: UserId) -> RepoResult<Vec<Task>>;
    fn get_task(&self, owner: UserId, id: TaskId) -> RepoResult<Option<Task>>;
    /// Inserts a row stamped with `now` and returns it with its store-assigned id.
    fn insert_task(&self, owner: UserId, task: &NewTask, now: i64) -> RepoResult<Task>;
    /// Applies a partial patch and returns the row as stored afterwards.
    fn update_task(
        &self,
        owner: UserId,
        id: TaskId,
        patch: &TaskPatch,
        now: i64,
    ) -> RepoResult<Task>;
    /// Returns whether a row was removed.
    fn delete_task(&self, owner: UserId, id: TaskId) -> RepoResult<bool>;
    /// Marks every completed recurring task of `owner` incomplete as of `now`.
    fn reset_completed_recurring(&self, owner: UserId, now: i64) -> RepoResult<usize>;
}

/// SQLite-backed task repository.
#[derive(Clone)]
pub struct SqliteTaskRepository {
    conn: SharedConnection,
}

impl SqliteTaskRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn list_tasks(&self, owner: UserId) -> RepoResult<Vec<Task>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn get_task(&self, owner: UserId, id: TaskId) -> RepoResult<Option<Task>> {
        let conn = lock_conn(&self.conn)?;
        fetch_task(&conn, owner, id)
    }

    fn insert_task(&self, owner: UserId, task: &NewTask, now: i64) -> RepoResult<Task> {
        let task = task.normalized()?;
        let id = Uuid::new_v4();
        let conn = lock_conn(&self.conn)?;

        conn.execute(
            "INSERT INTO tasks (
                id,
                user_id,
                text,
                completed,
                color,
                notes,
                is_recurring,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8);",
            params![
                id.to_string(),
                owner.to_string(),
                task.text.as_str(),
                bool_to_int(task.completed),
                task.color.as_str(),
                task.notes.as_str(),
                bool_to_int(task.is_recurring),
                now,
            ],
        )?;

        fetch_task(&conn, owner, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted task {id} missing in read-back"))
        })
    }

    fn update_task(
        &self,
        owner: UserId,
        id: TaskId,
        patch: &TaskPatch,
        now: i64,
    ) -> RepoResult<Task> {
        let patch = patch.normalized()?;
        let conn = lock_conn(&self.conn)?;

        let changed = conn.execute(
            "UPDATE tasks
             SET
                text = COALESCE(?3, text),
                completed = COALESCE(?4, completed),
                color = COALESCE(?5, color),
                notes = COALESCE(?6, notes),
                is_recurring = COALESCE(?7, is_recurring),
                updated_at = ?8
             WHERE id = ?1
               AND user_id = ?2;",
            params![
                id.to_string(),
                owner.to_string(),
                patch.text.as_deref(),
                patch.completed.map(bool_to_int),
                patch.color.as_deref(),
                patch.notes.as_deref(),
                patch.is_recurring.map(bool_to_int),
                now,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        fetch_task(&conn, owner, id)?.ok_or(RepoError::NotFound(id))
    }

    fn delete_task(&self, owner: UserId, id: TaskId) -> RepoResult<bool> {
        let conn = lock_conn(&self.conn)?;
        let changed = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2;",
            params![id.to_string(), owner.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn reset_completed_recurring(&self, owner: UserId, now: i64) -> RepoResult<usize> {
        let conn = lock_conn(&self.conn)?;
        let changed = conn.execute(
            "UPDATE tasks
             SET
                completed = 0,
                updated_at = ?2
             WHERE user_id = ?1
               AND is_recurring = 1
               AND completed = 1;",
            params![owner.to_string(), now],
        )?;
        Ok(changed)
    }
}

fn fetch_task(conn: &Connection, owner: UserId, id: TaskId) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL}
         WHERE id = ?1
           AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id.to_string(), owner.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_task_row(row)?));
    }
    Ok(None)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let owner_text: String = row.get("user_id")?;

    Ok(Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        user_id: parse_uuid(&owner_text, "tasks.user_id")?,
        text: row.get("text")?,
        completed: parse_flag(row.get("completed")?, "tasks.completed")?,
        color: row.get("color")?,
        notes: row.get("notes")?,
        is_recurring: parse_flag(row.get("is_recurring")?, "tasks.is_recurring")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
