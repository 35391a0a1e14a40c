//! SQLite implementation of [`SessionStore`].
//!
//! [`SqliteStore`] keeps one row per session and one snapshot row per
//! session, replaced on every save inside a transaction. The snapshot body is
//! its canonical JSON text, stored next to its blake3 digest and its format
//! version.
//!
//! The schema is managed by `rusqlite_migration` through SQLite's
//! `user_version` pragma, with migrations embedded via `include_str!`.
//! Opening a database that already holds snapshots written in a newer
//! format fails up front instead of on the first load.

use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::convert::{SessionSnapshot, SNAPSHOT_VERSION};
use crate::error::StorageError;
use crate::hash::{canonical_bytes, digest_bytes, verify_digest};
use crate::traits::SessionStore;
use crate::types::{SessionId, SessionSummary};

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(include_str!("migrations/001_initial_schema.sql")),
        M::up(include_str!("migrations/002_snapshot_version_check.sql")),
    ])
}

/// SQLite-backed implementation of [`SessionStore`].
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a session database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        Self::open(Connection::open(path)?)
    }

    /// Opens an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::open(Connection::open_in_memory()?)
    }

    fn open(mut conn: Connection) -> Result<Self, StorageError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations()
            .to_latest(&mut conn)
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        let newest: Option<u32> =
            conn.query_row("SELECT MAX(version) FROM snapshots", [], |row| row.get(0))?;
        if let Some(found) = newest.filter(|v| *v > SNAPSHOT_VERSION) {
            return Err(StorageError::UnsupportedVersion {
                found,
                expected: SNAPSHOT_VERSION,
            });
        }
        tracing::debug!(newest_snapshot = ?newest, "session database opened");
        Ok(SqliteStore { conn })
    }

    fn assert_session_exists(&self, id: SessionId) -> Result<(), StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::SessionNotFound(id.0));
        }
        Ok(())
    }
}

impl SessionStore for SqliteStore {
    fn create_session(&mut self, name: &str) -> Result<SessionId, StorageError> {
        self.conn
            .execute("INSERT INTO sessions (name) VALUES (?1)", params![name])?;
        let id = SessionId(self.conn.last_insert_rowid());
        tracing::debug!(%id, name, "session created");
        Ok(id)
    }

    fn save_snapshot(&mut self, id: SessionId, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        self.assert_session_exists(id)?;
        let body = canonical_bytes(snapshot)?;
        let digest = digest_bytes(&body).to_hex().to_string();
        let text = String::from_utf8_lossy(&body).into_owned();

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM snapshots WHERE session_id = ?1", params![id.0])?;
        tx.execute(
            "INSERT INTO snapshots (session_id, version, turn_num, digest, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id.0, snapshot.version, snapshot.turn_num, digest, text],
        )?;
        tx.commit()?;
        tracing::debug!(%id, turn = snapshot.turn_num, %digest, "snapshot saved");
        Ok(())
    }

    fn load_snapshot(&self, id: SessionId) -> Result<SessionSnapshot, StorageError> {
        self.assert_session_exists(id)?;
        let row: Option<(u32, String, String)> = self
            .conn
            .query_row(
                "SELECT version, digest, body FROM snapshots WHERE session_id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let (version, digest, body) = row.ok_or(StorageError::EmptySession(id.0))?;
        if version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: version,
                expected: SNAPSHOT_VERSION,
            });
        }
        verify_digest(body.as_bytes(), &digest, id.0)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn delete_session(&mut self, id: SessionId) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM snapshots WHERE session_id = ?1", params![id.0])?;
        let deleted = tx.execute("DELETE FROM sessions WHERE id = ?1", params![id.0])?;
        if deleted == 0 {
            return Err(StorageError::SessionNotFound(id.0));
        }
        tx.commit()?;
        Ok(())
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.name, p.turn_num, p.digest
             FROM sessions s LEFT JOIN snapshots p ON p.session_id = s.id
             ORDER BY s.id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SessionSummary {
                id: SessionId(row.get(0)?),
                name: row.get(1)?,
                turn_num: row.get::<_, Option<u32>>(2)?.unwrap_or(0),
                digest: row.get(3)?,
            })
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }
}
