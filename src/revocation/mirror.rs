//! In-memory mirror of the revocation table.
//!
//! Lookups take a shared lock for one hash check. A full sync builds the new
//! set off to the side and swaps it in under the write lock, so readers see
//! either the old set or the new one, never a partial build.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::revocation::RevokedToken;

#[derive(Debug, Clone, Copy)]
struct MirrorEntry {
    expires_at: DateTime<Utc>,
    /// When this process inserted the entry locally; `None` for loaded rows.
    inserted_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct MirrorState {
    entries: HashMap<String, MirrorEntry>,
    synced_at: Option<Instant>,
}

// == Revocation Mirror ==
#[derive(Debug, Default)]
pub struct RevocationMirror {
    state: RwLock<MirrorState>,
}

impl RevocationMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// O(1) membership check.
    pub fn contains(&self, token_hash: &str) -> bool {
        self.read().entries.contains_key(token_hash)
    }

    /// Records a revocation made on this process; visible to the next lookup.
    pub fn insert(&self, token_hash: &str, expires_at: DateTime<Utc>) {
        let entry = MirrorEntry {
            expires_at,
            inserted_at: Some(Instant::now()),
        };
        self.write()
            .entries
            .entry(token_hash.to_string())
            .and_modify(|existing| {
                existing.expires_at = existing.expires_at.max(expires_at);
                existing.inserted_at = entry.inserted_at;
            })
            .or_insert(entry);
    }

    /// Adds a row found by a reconciliation query without marking it local.
    pub fn remember(&self, record: &RevokedToken) {
        self.write()
            .entries
            .entry(record.token_hash.clone())
            .or_insert(MirrorEntry {
                expires_at: record.expires_at,
                inserted_at: None,
            });
    }

    /// Replaces the whole set with `loaded` plus `pending` rows.
    ///
    /// Entries inserted locally at or after `started` (while the sync query
    /// was in flight) and not yet expired are carried over so a concurrent
    /// revoke is never lost. Marks the mirror fresh.
    pub fn replace(
        &self,
        loaded: Vec<RevokedToken>,
        pending: &[RevokedToken],
        started: Instant,
        now: DateTime<Utc>,
    ) -> usize {
        let mut entries: HashMap<String, MirrorEntry> = loaded
            .into_iter()
            .chain(pending.iter().cloned())
            .filter(|record| record.is_active_at(now))
            .map(|record| {
                (
                    record.token_hash,
                    MirrorEntry {
                        expires_at: record.expires_at,
                        inserted_at: None,
                    },
                )
            })
            .collect();

        let mut state = self.write();
        for (hash, entry) in &state.entries {
            let recent = entry.inserted_at.is_some_and(|at| at >= started);
            if recent && entry.expires_at > now {
                entries.insert(hash.clone(), *entry);
            }
        }

        let count = entries.len();
        state.entries = entries;
        state.synced_at = Some(Instant::now());
        count
    }

    /// True when no full sync has completed within `threshold`.
    pub fn is_stale(&self, threshold: Duration) -> bool {
        match self.read().synced_at {
            Some(at) => at.elapsed() > threshold,
            None => true,
        }
    }

    pub fn last_synced(&self) -> Option<Instant> {
        self.read().synced_at
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, MirrorState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MirrorState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
