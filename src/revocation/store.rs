//! Revocation store: durable table plus in-memory mirror.
//!
//! The store is the only writer of both. Revocations land in the table first
//! and in the mirror right after; a failed table write is kept in a pending
//! set, still mirrored, and retried by every sync until it sticks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::revocation::{
    hash_prefix, token_hash, RevocationBackend, RevocationMirror, RevokedToken,
};

// == Revocation Config ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevocationConfig {
    /// Interval between full mirror reloads
    pub sync_interval: Duration,
    /// Interval between purges of expired rows
    pub reaper_interval: Duration,
    /// Mirror age after which a lookup miss is double-checked in the table
    pub staleness_threshold: Duration,
    /// Upper bound on any single table call made on behalf of a request
    pub backend_timeout: Duration,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            reaper_interval: Duration::from_secs(3600),
            staleness_threshold: Duration::from_secs(120),
            backend_timeout: Duration::from_millis(500),
        }
    }
}

// == Revocation Store ==
pub struct RevocationStore {
    backend: Arc<dyn RevocationBackend>,
    mirror: RevocationMirror,
    /// Rows mirrored locally whose table write has not succeeded yet
    pending: Mutex<HashMap<String, RevokedToken>>,
    config: RevocationConfig,
}

impl std::fmt::Debug for RevocationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationStore")
            .field("mirror_len", &self.mirror.len())
            .field("pending", &self.pending_len())
            .field("config", &self.config)
            .finish()
    }
}

impl RevocationStore {
    pub fn new(backend: Arc<dyn RevocationBackend>, config: RevocationConfig) -> Self {
        Self {
            backend,
            mirror: RevocationMirror::new(),
            pending: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RevocationConfig {
        &self.config
    }

    pub fn mirror(&self) -> &RevocationMirror {
        &self.mirror
    }

    /// Number of revocations still waiting for a successful table write.
    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // == Revoke ==
    /// Revokes `token` until `ttl` from now.
    ///
    /// Never fails: if the table write fails or times out, the revocation is
    /// still enforced from memory and the write is retried on the next sync.
    pub async fn revoke(
        &self,
        token: &str,
        subject_id: Option<&str>,
        reason: &str,
        ttl: Duration,
    ) {
        let record = RevokedToken::new(
            token,
            subject_id.map(str::to_string),
            reason,
            Utc::now(),
            ttl,
        );
        let hash = hash_prefix(&record.token_hash).to_string();

        match self.bounded(self.backend.upsert(&record)).await {
            Ok(()) => {
                debug!(token_hash = %hash, reason, "Token revoked");
            }
            Err(err) => {
                error!(
                    token_hash = %hash,
                    error = %err,
                    "Failed to persist revocation, enforcing from memory until resync"
                );
                self.pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(record.token_hash.clone())
                    .and_modify(|row| row.merge_from(&record))
                    .or_insert_with(|| record.clone());
            }
        }

        self.mirror.insert(&record.token_hash, record.expires_at);
    }

    // == Is Revoked ==
    /// Checks whether `token` has been revoked.
    ///
    /// A mirror hit answers immediately. On a miss with a stale mirror the
    /// table is queried directly; if that query errors or times out the token
    /// is treated as revoked.
    pub async fn is_revoked(&self, token: &str) -> bool {
        let hash = token_hash(token);

        if self.mirror.contains(&hash) {
            return true;
        }

        if !self.mirror.is_stale(self.config.staleness_threshold) {
            return false;
        }

        match self.bounded(self.backend.find_active(&hash, Utc::now())).await {
            Ok(Some(record)) => {
                info!(
                    token_hash = %hash_prefix(&hash),
                    "Reconciliation found revocation missing from mirror"
                );
                self.mirror.remember(&record);
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!(
                    token_hash = %hash_prefix(&hash),
                    error = %err,
                    "Revocation reconciliation failed, rejecting token"
                );
                true
            }
        }
    }

    // == Revoke All For Subject ==
    /// Re-stamps every table row of a subject as revoked now, then resyncs.
    pub async fn revoke_all_for_subject(
        &self,
        subject_id: &str,
        reason: &str,
    ) -> StorageResult<u64> {
        let now = Utc::now();
        let touched = self
            .bounded(self.backend.revoke_subject(subject_id, reason, now))
            .await?;

        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            for row in pending
                .values_mut()
                .filter(|row| row.subject_id.as_deref() == Some(subject_id))
            {
                row.revoked_at = now;
                row.reason = reason.to_string();
            }
        }

        info!(subject_id, reason, touched, "Revoked all tokens for subject");

        if let Err(err) = self.bounded(self.sync()).await {
            warn!(error = %err, "Resync after subject revocation failed");
        }
        Ok(touched)
    }

    // == Sync ==
    /// Reloads the mirror from the table.
    ///
    /// Pending writes are retried first. On a load failure the current mirror
    /// is left untouched.
    pub async fn sync(&self) -> StorageResult<usize> {
        let started = Instant::now();
        self.retry_pending().await;

        let now = Utc::now();
        let loaded = match self.backend.load_active(now).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(error = %err, "Revocation sync failed, keeping current mirror");
                return Err(err);
            }
        };

        let pending: Vec<RevokedToken> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let count = self.mirror.replace(loaded, &pending, started, now);
        debug!(entries = count, pending = pending.len(), "Revocation mirror synced");
        Ok(count)
    }

    // == Reap ==
    /// Deletes expired rows, then resyncs so the mirror drops them too.
    pub async fn reap(&self) -> StorageResult<u64> {
        let now = Utc::now();
        let removed = match self.backend.delete_expired(now).await {
            Ok(removed) => removed,
            Err(err) => {
                error!(error = %err, "Revocation reaper failed, keeping current state");
                return Err(err);
            }
        };

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, row| row.is_active_at(now));

        if removed > 0 {
            info!(removed, "Reaped expired revocations");
        }

        self.sync().await?;
        Ok(removed)
    }

    async fn retry_pending(&self) {
        let pending: Vec<RevokedToken> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for record in pending {
            match self.backend.upsert(&record).await {
                Ok(()) => {
                    let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                    // A newer revoke of the same token may have replaced the row meanwhile.
                    if pending.get(&record.token_hash) == Some(&record) {
                        pending.remove(&record.token_hash);
                    }
                    info!(
                        token_hash = %hash_prefix(&record.token_hash),
                        "Persisted pending revocation"
                    );
                }
                Err(err) => {
                    warn!(
                        token_hash = %hash_prefix(&record.token_hash),
                        error = %err,
                        "Pending revocation still not persisted"
                    );
                }
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        match timeout(self.config.backend_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Unavailable(format!(
                "backend call timed out after {:?}",
                self.config.backend_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revocation::MemoryBackend;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicBool, Ordering};

    const FOUR_HOURS: Duration = Duration::from_secs(4 * 3600);

    /// Wraps a memory backend and can be switched into failing or hanging.
    #[derive(Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        failing: AtomicBool,
        failing_writes: AtomicBool,
        hanging: AtomicBool,
    }

    impl FlakyBackend {
        async fn check(&self) -> StorageResult<()> {
            if self.hanging.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("database down".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RevocationBackend for FlakyBackend {
        async fn upsert(&self, record: &RevokedToken) -> StorageResult<()> {
            self.check().await?;
            if self.failing_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("read-only replica".into()));
            }
            self.inner.upsert(record).await
        }

        async fn find_active(
            &self,
            token_hash: &str,
            now: DateTime<Utc>,
        ) -> StorageResult<Option<RevokedToken>> {
            self.check().await?;
            self.inner.find_active(token_hash, now).await
        }

        async fn load_active(&self, now: DateTime<Utc>) -> StorageResult<Vec<RevokedToken>> {
            self.check().await?;
            self.inner.load_active(now).await
        }

        async fn revoke_subject(
            &self,
            subject_id: &str,
            reason: &str,
            now: DateTime<Utc>,
        ) -> StorageResult<u64> {
            self.check().await?;
            self.inner.revoke_subject(subject_id, reason, now).await
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
            self.check().await?;
            self.inner.delete_expired(now).await
        }
    }

    fn store_with(backend: Arc<dyn RevocationBackend>) -> RevocationStore {
        RevocationStore::new(backend, RevocationConfig::default())
    }

    #[tokio::test]
    async fn test_revoke_then_is_revoked() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        store.sync().await.unwrap();

        store.revoke("tok123", Some("u1"), "logout", FOUR_HOURS).await;

        assert!(store.is_revoked("tok123").await);
        assert!(!store.is_revoked("tok456").await);
        let row = backend.row(&token_hash("tok123")).unwrap();
        assert_eq!(row.subject_id.as_deref(), Some("u1"));
        assert_eq!(row.reason, "logout");
    }

    #[tokio::test]
    async fn test_revoke_twice_updates_single_row() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());

        store.revoke("tok123", Some("u1"), "logout", FOUR_HOURS).await;
        let first = backend.row(&token_hash("tok123")).unwrap();
        store.revoke("tok123", Some("u1"), "manual", FOUR_HOURS).await;

        assert_eq!(backend.len(), 1);
        let second = backend.row(&token_hash("tok123")).unwrap();
        assert_eq!(second.reason, "manual");
        assert!(second.revoked_at >= first.revoked_at);
        assert_eq!(store.mirror().len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_survives_backend_failure() {
        let backend = Arc::new(FlakyBackend::default());
        let store = store_with(backend.clone());
        store.sync().await.unwrap();

        backend.failing.store(true, Ordering::SeqCst);
        store.revoke("tok123", None, "logout", FOUR_HOURS).await;

        assert!(store.is_revoked("tok123").await);
        assert_eq!(store.pending_len(), 1);
        assert!(backend.inner.is_empty());

        // A failing sync leaves the mirror alone
        assert!(store.sync().await.is_err());
        assert!(store.is_revoked("tok123").await);

        // Once the table recovers the pending write is flushed
        backend.failing.store(false, Ordering::SeqCst);
        store.sync().await.unwrap();
        assert_eq!(store.pending_len(), 0);
        assert!(backend.inner.row(&token_hash("tok123")).is_some());
        assert!(store.is_revoked("tok123").await);
    }

    #[tokio::test]
    async fn test_sync_keeps_pending_when_retry_fails() {
        let backend = Arc::new(FlakyBackend::default());
        let store = store_with(backend.clone());

        backend.failing_writes.store(true, Ordering::SeqCst);
        store.revoke("tok123", None, "logout", FOUR_HOURS).await;
        assert_eq!(store.pending_len(), 1);

        // Loads succeed while writes keep failing: the resynced mirror must
        // still carry the unpersisted revocation.
        store.sync().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        store.sync().await.unwrap();

        assert_eq!(store.pending_len(), 1);
        assert!(backend.inner.is_empty());
        assert!(store.is_revoked("tok123").await);
    }

    #[tokio::test]
    async fn test_sync_picks_up_rows_written_elsewhere() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        store.sync().await.unwrap();

        let foreign = RevokedToken::new("elsewhere", None, "manual", Utc::now(), FOUR_HOURS);
        backend.upsert(&foreign).await.unwrap();

        // Mirror is fresh, so the miss is trusted until the next sync
        assert!(!store.is_revoked("elsewhere").await);

        store.sync().await.unwrap();
        assert!(store.is_revoked("elsewhere").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_mirror_reconciles_against_table() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        store.sync().await.unwrap();

        let foreign = RevokedToken::new("elsewhere", None, "manual", Utc::now(), FOUR_HOURS);
        backend.upsert(&foreign).await.unwrap();

        tokio::time::advance(store.config().staleness_threshold + Duration::from_secs(1)).await;

        assert!(store.is_revoked("elsewhere").await);
        assert!(store.mirror().contains(&token_hash("elsewhere")));
        assert!(!store.is_revoked("never-revoked").await);
    }

    #[tokio::test]
    async fn test_never_synced_mirror_reconciles() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .upsert(&RevokedToken::new("old", None, "logout", Utc::now(), FOUR_HOURS))
            .await
            .unwrap();
        let store = store_with(backend);

        assert!(store.is_revoked("old").await);
    }

    #[tokio::test]
    async fn test_reconciliation_error_fails_closed() {
        let backend = Arc::new(FlakyBackend::default());
        let store = store_with(backend.clone());

        backend.failing.store(true, Ordering::SeqCst);

        assert!(store.is_revoked("unknown").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconciliation_timeout_fails_closed() {
        let backend = Arc::new(FlakyBackend::default());
        let store = store_with(backend.clone());

        backend.hanging.store(true, Ordering::SeqCst);
        let started = Instant::now();

        assert!(store.is_revoked("unknown").await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoke_does_not_hang_on_slow_backend() {
        let backend = Arc::new(FlakyBackend::default());
        let store = store_with(backend.clone());

        backend.hanging.store(true, Ordering::SeqCst);
        store.revoke("tok123", None, "logout", FOUR_HOURS).await;

        assert_eq!(store.pending_len(), 1);
        assert!(store.mirror().contains(&token_hash("tok123")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoke_all_for_subject_times_out_on_slow_backend() {
        let backend = Arc::new(FlakyBackend::default());
        let store = store_with(backend.clone());
        store.revoke("a", Some("u1"), "logout", FOUR_HOURS).await;

        backend.hanging.store(true, Ordering::SeqCst);
        let started = Instant::now();

        let result = store.revoke_all_for_subject("u1", "offboarded").await;

        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(backend.inner.row(&token_hash("a")).unwrap().reason, "logout");
    }

    #[tokio::test]
    async fn test_revoke_all_for_subject() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());
        store.revoke("a", Some("u1"), "logout", FOUR_HOURS).await;
        store.revoke("b", Some("u1"), "logout", FOUR_HOURS).await;
        store.revoke("c", Some("u2"), "logout", FOUR_HOURS).await;

        let touched = store
            .revoke_all_for_subject("u1", "bulk-revocation")
            .await
            .unwrap();

        assert_eq!(touched, 2);
        assert_eq!(backend.row(&token_hash("a")).unwrap().reason, "bulk-revocation");
        assert_eq!(backend.row(&token_hash("c")).unwrap().reason, "logout");
        assert!(store.is_revoked("a").await);
        assert!(store.is_revoked("c").await);
        assert!(!store.mirror().is_stale(store.config().staleness_threshold));
    }

    #[tokio::test]
    async fn test_reap_removes_expired_and_resyncs() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone());

        store.revoke("tok123", Some("u1"), "logout", Duration::ZERO).await;
        store.revoke("live", None, "logout", FOUR_HOURS).await;
        assert!(store.is_revoked("tok123").await);

        tokio::time::sleep(Duration::from_millis(5)).await;

        let removed = store.reap().await.unwrap();

        assert_eq!(removed, 1);
        assert!(backend.row(&token_hash("tok123")).is_none());
        assert!(!store.is_revoked("tok123").await);
        assert!(store.is_revoked("live").await);
    }

    #[tokio::test]
    async fn test_reap_failure_keeps_mirror() {
        let backend = Arc::new(FlakyBackend::default());
        let store = store_with(backend.clone());
        store.revoke("tok123", None, "logout", FOUR_HOURS).await;

        backend.failing.store(true, Ordering::SeqCst);

        assert!(store.reap().await.is_err());
        assert!(store.is_revoked("tok123").await);
    }
}
