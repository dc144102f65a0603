//! Category Store Module
//!
//! Storage for a single cache category: a keyed map of TTL entries guarded by
//! a lock that is held only for the duration of one operation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::cache::stats::StatsCounters;
use crate::cache::{CacheEntry, CacheStats, CategoryConfig};

// == Category Store ==
/// Entries of one category plus its hit/miss counters.
#[derive(Debug)]
pub struct CategoryStore {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Performance statistics
    counters: StatsCounters,
    /// Bumped by every flush, under the write lock
    generation: AtomicU64,
    /// TTL and sweep settings for this category
    config: CategoryConfig,
}

impl CategoryStore {
    // == Constructor ==
    pub fn new(config: CategoryConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            counters: StatsCounters::default(),
            generation: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are reported as misses but left for the sweeper, so a
    /// lookup only ever takes the shared lock.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let entries = self.read();

        match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.counters.record_hit();
                Some(entry.value.clone())
            }
            _ => {
                self.counters.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores a value, replacing any existing entry and resetting its TTL.
    ///
    /// `ttl` falls back to the category's configured lifetime.
    pub fn set(&self, key: String, value: Value, ttl: Option<Duration>) {
        let entry = CacheEntry::new(value, ttl.unwrap_or(self.config.ttl));
        self.write().insert(key, entry);
    }

    /// Current flush generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Stores a value only if no flush happened since `generation` was read.
    ///
    /// Returns `false` when the insert was dropped. Used by read-through
    /// callers whose value was computed before a concurrent flush.
    pub fn set_if_generation(
        &self,
        generation: u64,
        key: String,
        value: Value,
        ttl: Option<Duration>,
    ) -> bool {
        let entry = CacheEntry::new(value, ttl.unwrap_or(self.config.ttl));
        let mut entries = self.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        entries.insert(key, entry);
        true
    }

    // == Delete ==
    /// Removes an entry by key, returning how many entries were removed.
    pub fn delete(&self, key: &str) -> usize {
        usize::from(self.write().remove(key).is_some())
    }

    // == Flush ==
    /// Empties the category in one swap under the write lock.
    pub fn flush(&self) -> usize {
        let mut entries = self.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let drained = std::mem::take(&mut *entries);
        drained.len()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let removed = {
            let mut entries = self.write();
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired_at(now));
            before - entries.len()
        };

        self.counters.record_evictions(removed);
        removed
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated, so
    // poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
