//! Category Registry
//!
//! Static mapping of cache category name to its TTL and sweep interval.
//! Built once at process start and never mutated afterwards.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::warn;

/// Names that collide with static routes under `/cache` and cannot be categories.
pub const RESERVED_CATEGORY_NAMES: &[&str] = &["stats"];

/// Default categories for the thesis workflow API: `name:ttl:sweep` in seconds.
pub const DEFAULT_CATEGORIES: &str =
    "users:300:60,config:600:120,projects:120:60,proposals:120:60,availability:60:30";

// == Category Config ==
/// Immutable per-category settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryConfig {
    /// Lifetime of entries inserted without an override
    pub ttl: Duration,
    /// How often the sweeper evicts expired entries
    pub sweep_interval: Duration,
}

impl CategoryConfig {
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self { ttl, sweep_interval }
    }
}

// == Category Registry ==
/// Closed set of cache categories known to the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: BTreeMap<String, CategoryConfig>,
}

impl CategoryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a category, replacing any previous settings under that name.
    ///
    /// Reserved names are skipped with a warning.
    #[must_use]
    pub fn with_category(
        mut self,
        name: impl Into<String>,
        ttl: Duration,
        sweep_interval: Duration,
    ) -> Self {
        let name = name.into();
        if is_reserved(&name) {
            warn!(category = %name, "Skipping reserved cache category name");
            return self;
        }
        self.categories
            .insert(name, CategoryConfig::new(ttl, sweep_interval));
        self
    }

    /// Parses a `name:ttl_secs:sweep_secs` comma list.
    ///
    /// Malformed entries and reserved names are skipped with a warning; a zero
    /// sweep interval is raised to one second so the ticker never spins.
    pub fn parse(raw: &str) -> Self {
        let mut registry = Self::new();

        for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let parts: Vec<&str> = item.split(':').map(str::trim).collect();
            let parsed = match parts.as_slice() {
                [name, ttl, sweep] if !name.is_empty() => ttl
                    .parse::<u64>()
                    .ok()
                    .zip(sweep.parse::<u64>().ok())
                    .map(|(ttl, sweep)| (*name, ttl, sweep.max(1))),
                _ => None,
            };

            match parsed {
                Some((name, ttl, sweep)) => {
                    registry = registry.with_category(
                        name,
                        Duration::from_secs(ttl),
                        Duration::from_secs(sweep),
                    );
                }
                None => warn!(entry = item, "Skipping malformed cache category"),
            }
        }

        registry
    }

    /// Registry with the thesis workflow categories.
    pub fn with_defaults() -> Self {
        Self::parse(DEFAULT_CATEGORIES)
    }

    /// Looks up a category's settings.
    pub fn get(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Iterates categories in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryConfig)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn is_reserved(name: &str) -> bool {
    RESERVED_CATEGORY_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}
