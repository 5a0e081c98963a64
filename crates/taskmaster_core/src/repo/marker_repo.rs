//! Persisted per-user sync markers.
//!
//! Holds small string values the client must remember between sessions,
//! such as the last calendar day recurring tasks were reset.

use crate::db::SharedConnection;
use crate::model::UserId;
use crate::repo::{lock_conn, RepoError, RepoResult};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;
use std::sync::Mutex;

/// Marker key for the last recurring-task reset date (`YYYY-MM-DD`).
pub const LAST_RESET_DATE_KEY: &str = "last_reset_date";

/// Key/value marker storage scoped by owner.
pub trait MarkerRepository {
    fn get_marker(&self, owner: UserId, key: &str) -> RepoResult<Option<String>>;
    /// Inserts or replaces the marker value, stamped with `now`.
    fn set_marker(&self, owner: UserId, key: &str, value: &str, now: i64) -> RepoResult<()>;
}

/// SQLite-backed markers stored in `sync_markers`.
#[derive(Clone)]
pub struct SqliteMarkerRepository {
    conn: SharedConnection,
}

impl SqliteMarkerRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl MarkerRepository for SqliteMarkerRepository {
    fn get_marker(&self, owner: UserId, key: &str) -> RepoResult<Option<String>> {
        let conn = lock_conn(&self.conn)?;
        let value = conn
            .query_row(
                "SELECT value FROM sync_markers WHERE user_id = ?1 AND key = ?2;",
                params![owner.to_string(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_marker(&self, owner: UserId, key: &str, value: &str, now: i64) -> RepoResult<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO sync_markers (user_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![owner.to_string(), key, value, now],
        )?;
        Ok(())
    }
}

/// Process-local markers, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryMarkerRepository {
    values: Mutex<HashMap<(UserId, String), String>>,
}

impl MemoryMarkerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkerRepository for MemoryMarkerRepository {
    fn get_marker(&self, owner: UserId, key: &str) -> RepoResult<Option<String>> {
        let values = self.values.lock().map_err(|_| RepoError::LockPoisoned)?;
        Ok(values.get(&(owner, key.to_string())).cloned())
    }

    fn set_marker(&self, owner: UserId, key: &str, value: &str, _now: i64) -> RepoResult<()> {
        let mut values = self.values.lock().map_err(|_| RepoError::LockPoisoned)?;
        values.insert((owner, key.to_string()), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkerRepository, MemoryMarkerRepository, LAST_RESET_DATE_KEY};
    use uuid::Uuid;

    #[test]
    fn memory_markers_are_scoped_by_owner() {
        let markers = MemoryMarkerRepository::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        markers
            .set_marker(alice, LAST_RESET_DATE_KEY, "2026-03-01", 0)
            .unwrap();

        assert_eq!(
            markers.get_marker(alice, LAST_RESET_DATE_KEY).unwrap(),
            Some("2026-03-01".to_string())
        );
        assert_eq!(markers.get_marker(bob, LAST_RESET_DATE_KEY).unwrap(), None);
    }
}
