//! Durable revocation table interface.
//!
//! The table is keyed by `token_hash` and indexed by `expires_at`. Backends
//! only persist; keeping the in-memory mirror in step is the store's job.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;
use crate::revocation::RevokedToken;

/// Storage backend for revoked token hashes.
#[async_trait]
pub trait RevocationBackend: Send + Sync {
    /// Inserts a row, or merges into the existing row for the same hash.
    ///
    /// Re-revoking a token must succeed and must not create a second row.
    async fn upsert(&self, record: &RevokedToken) -> StorageResult<()>;

    /// Looks up one hash, ignoring rows that expired before `now`.
    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<RevokedToken>>;

    /// Every row with `expires_at > now`.
    async fn load_active(&self, now: DateTime<Utc>) -> StorageResult<Vec<RevokedToken>>;

    /// Marks all rows of a subject as revoked at `now` with `reason`.
    ///
    /// Returns the number of rows touched.
    async fn revoke_subject(
        &self,
        subject_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<u64>;

    /// Deletes rows with `expires_at < now`, returning how many were removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64>;
}

// == Memory Backend ==
/// Process-local table. Stands in for the relational store in tests and
/// single-node deployments that accept losing revocations on restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: RwLock<HashMap<String, RevokedToken>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored, expired or not.
    pub fn len(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct row lookup, regardless of expiry.
    pub fn row(&self, token_hash: &str) -> Option<RevokedToken> {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token_hash)
            .cloned()
    }
}

/// Shared upsert rule for table-like backends.
pub(crate) fn upsert_row(rows: &mut HashMap<String, RevokedToken>, record: &RevokedToken) {
    rows.entry(record.token_hash.clone())
        .and_modify(|row| row.merge_from(record))
        .or_insert_with(|| record.clone());
}

/// Shared bulk-revocation rule for table-like backends.
pub(crate) fn revoke_subject_rows(
    rows: &mut HashMap<String, RevokedToken>,
    subject_id: &str,
    reason: &str,
    now: DateTime<Utc>,
) -> u64 {
    let mut touched = 0;
    for row in rows
        .values_mut()
        .filter(|row| row.subject_id.as_deref() == Some(subject_id))
    {
        row.revoked_at = now;
        row.reason = reason.to_string();
        touched += 1;
    }
    touched
}

/// Shared purge rule for table-like backends.
pub(crate) fn delete_expired_rows(
    rows: &mut HashMap<String, RevokedToken>,
    now: DateTime<Utc>,
) -> u64 {
    let before = rows.len();
    rows.retain(|_, row| row.expires_at >= now);
    (before - rows.len()) as u64
}

#[async_trait]
impl RevocationBackend for MemoryBackend {
    async fn upsert(&self, record: &RevokedToken) -> StorageResult<()> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        upsert_row(&mut rows, record);
        Ok(())
    }

    async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<RevokedToken>> {
        Ok(self.row(token_hash).filter(|row| row.is_active_at(now)))
    }

    async fn load_active(&self, now: DateTime<Utc>) -> StorageResult<Vec<RevokedToken>> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows
            .values()
            .filter(|row| row.is_active_at(now))
            .cloned()
            .collect())
    }

    async fn revoke_subject(
        &self,
        subject_id: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<u64> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        Ok(revoke_subject_rows(&mut rows, subject_id, reason, now))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        Ok(delete_expired_rows(&mut rows, now))
    }
}
