//! SQLite revocation table.
//!
//! Every call goes to the database, so several processes opening the same
//! file share one table: a row written by one is visible to the others on
//! their next query, and no process ever overwrites rows it did not touch.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::revocation::{RevocationBackend, RevokedToken};

const REVOCATION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS revoked_tokens (
    token_hash  TEXT PRIMARY KEY,
    subject_id  TEXT,
    reason      TEXT NOT NULL,
    revoked_at  INTEGER NOT NULL,
    expires_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires_at ON revoked_tokens(expires_at);
CREATE INDEX IF NOT EXISTS idx_revoked_tokens_subject_id ON revoked_tokens(subject_id);
"#;

/// Lock wait before a write gives up while another process holds the file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str =
    "SELECT token_hash, subject_id, reason, revoked_at, expires_at FROM revoked_tokens";

/// Revocation table stored in a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let target = path.clone();

        let conn = tokio::task::spawn_blocking(move || -> StorageResult<Connection> {
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(&target)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            // WAL lets readers in other processes proceed during a write
            let _ = conn.execute_batch("PRAGMA journal_mode = WAL");
            conn.execute_batch(REVOCATION_SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|err| StorageError::Unavailable(format!("open task failed: {err}")))??;

        info!(path = %path.display(), "Opened revocation table");

        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            op(&conn)
        })
        .await
        .map_err(|err| StorageError::Unavailable(format!("database task failed: {err}")))?;
        Ok(result?)
    }
}

fn micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(column: usize, value: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(value)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, value))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RevokedToken> {
    Ok(RevokedToken {
        token_hash: row.get(0)?,
        subject_id: row.get(1)?,
        reason: row.get(2)?,
        revoked_at: from_micros(3, row.get(3)?)?,
        expires_at: from_micros(4, row.get(4)?)?,
    })
}

#[async_trait]
impl RevocationBackend for SqliteBackend {
    async fn upsert(&self, record: &RevokedToken) -> StorageResult<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT INTO revoked_tokens (token_hash, subject_id, reason, revoked_at, expires_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(token_hash) DO UPDATE SET
                    subject_id = COALESCE(excluded.subject_id, revoked_tokens.subject_id),
                    reason     = excluded.reason,
                    revoked_at = excluded.revoked_at,
                    expires_at = MAX(revoked_tokens.expires_at, excluded.expires_at)
                "#,
                params![
                    record.token_hash,
                    record.subject_id,
                    record.reason,
                    micros(record.revoked_at),
                    micros(record.expires_at),
                ],
            )
            .map(|_| ())
        })
        .await
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<RevokedToken>> {
        let token_hash = token_hash.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE token_hash = ?1 AND expires_at > ?2"),
                params![token_hash, micros(now)],
                read_row,
            )
            .optional()
        })
        .await
    }

    async fn load_active(&self, now: DateTime<Utc>) -> StorageResult<Vec<RevokedToken>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE expires_at > ?1"))?;
            let rows = stmt.query_map(params![micros(now)], read_row)?;
            rows.collect()
        })
        .await
    }

    async fn revoke_subject(
        &self,
        subject_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<u64> {
        let subject_id = subject_id.to_string();
        let reason = reason.to_string();
        let touched = self
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE revoked_tokens SET revoked_at = ?1, reason = ?2 WHERE subject_id = ?3",
                    params![micros(now), reason, subject_id],
                )
            })
            .await?;
        Ok(touched as u64)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let removed = self
            .with_conn(move |conn| {
                conn.execute(
                    "DELETE FROM revoked_tokens WHERE expires_at < ?1",
                    params![micros(now)],
                )
            })
            .await?;
        debug!(path = %self.path.display(), removed, "Deleted expired revocations");
        Ok(removed as u64)
    }
}
