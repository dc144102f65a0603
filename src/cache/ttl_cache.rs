//! Multi-category TTL cache.
//!
//! The category set is fixed at construction, so the outer map is immutable
//! and shared without a lock; each category guards its own entries. Every
//! operation against an unknown category logs a warning and degrades to a
//! miss or no-op rather than failing the request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CategoryConfig, CategoryRegistry, CategoryStore};

// == TTL Cache ==
/// Cheap-to-clone handle on the per-category stores.
#[derive(Debug, Clone)]
pub struct TtlCache {
    categories: Arc<HashMap<String, CategoryStore>>,
}

impl TtlCache {
    // == Constructor ==
    /// Creates one empty store per registered category.
    pub fn new(registry: &CategoryRegistry) -> Self {
        let categories = registry
            .iter()
            .map(|(name, config)| (name.to_string(), CategoryStore::new(*config)))
            .collect();

        Self {
            categories: Arc::new(categories),
        }
    }

    fn category(&self, category: &str) -> Option<&CategoryStore> {
        let store = self.categories.get(category);
        if store.is_none() {
            warn!(category, "Cache operation on unregistered category");
        }
        store
    }

    // == Get ==
    /// Returns the cached value if present and not expired.
    pub fn get(&self, category: &str, key: &str) -> Option<Value> {
        self.category(category)?.get(key)
    }

    // == Set ==
    /// Inserts or replaces an entry. Returns `false` for unknown categories.
    pub fn set(
        &self,
        category: &str,
        key: impl Into<String>,
        value: Value,
        ttl: Option<Duration>,
    ) -> bool {
        match self.category(category) {
            Some(store) => {
                store.set(key.into(), value, ttl);
                true
            }
            None => false,
        }
    }

    /// Flush generation of a category, `None` when it is not registered.
    pub fn generation(&self, category: &str) -> Option<u64> {
        self.category(category).map(CategoryStore::generation)
    }

    /// Inserts only if the category was not flushed since `generation`.
    ///
    /// Returns `false` when the insert was dropped or the category is unknown.
    pub fn set_if_generation(
        &self,
        category: &str,
        generation: u64,
        key: impl Into<String>,
        value: Value,
        ttl: Option<Duration>,
    ) -> bool {
        self.category(category)
            .is_some_and(|store| store.set_if_generation(generation, key.into(), value, ttl))
    }

    // == Delete ==
    pub fn delete(&self, category: &str, key: &str) -> usize {
        self.category(category).map_or(0, |store| store.delete(key))
    }

    // == Flush Category ==
    /// Removes every entry of one category; readers see it either full or empty.
    pub fn flush_category(&self, category: &str) -> usize {
        let removed = self.category(category).map_or(0, CategoryStore::flush);
        debug!(category, removed, "Flushed cache category");
        removed
    }

    // == Flush All ==
    pub fn flush_all(&self) -> usize {
        self.categories.values().map(CategoryStore::flush).sum()
    }

    // == Sweep ==
    /// Evicts expired entries of one category.
    pub fn sweep(&self, category: &str) -> usize {
        self.category(category)
            .map_or(0, CategoryStore::cleanup_expired)
    }

    // == Stats ==
    /// Statistics for one category, or summed across all when `None`.
    ///
    /// Returns `None` only when a named category is not registered.
    pub fn stats(&self, category: Option<&str>) -> Option<CacheStats> {
        match category {
            Some(name) => self.categories.get(name).map(CategoryStore::stats),
            None => Some(
                self.categories
                    .values()
                    .map(CategoryStore::stats)
                    .fold(CacheStats::default(), CacheStats::merge),
            ),
        }
    }

    /// Per-category statistics in name order.
    pub fn stats_by_category(&self) -> Vec<(String, CacheStats)> {
        let mut all: Vec<(String, CacheStats)> = self
            .categories
            .iter()
            .map(|(name, store)| (name.clone(), store.stats()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Registered categories with their settings.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryConfig)> {
        self.categories
            .iter()
            .map(|(name, store)| (name.as_str(), store.config()))
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }
}
