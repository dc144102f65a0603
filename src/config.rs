//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CategoryRegistry, DEFAULT_CATEGORIES};
use crate::revocation::RevocationConfig;
use crate::tasks::MAX_PERIOD;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Public HTTP port, bound on every interface
    pub server_port: u16,
    /// Operations API port, bound on loopback only
    pub admin_port: u16,
    /// Cache categories with their TTL and sweep interval
    pub categories: CategoryRegistry,
    /// Revocation sync, reaper and reconciliation timings
    pub revocation: RevocationConfig,
    /// Lifetime of issued tokens, used as the default revocation TTL
    pub token_lifetime: Duration,
    /// Location of the durable revocation table
    pub revocation_store_path: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - Public HTTP port (default: 3000)
    /// - `ADMIN_PORT` - Loopback operations API port (default: 3001)
    /// - `CACHE_CATEGORIES` - `name:ttl:sweep` list, seconds (default: see `DEFAULT_CATEGORIES`)
    /// - `REVOCATION_SYNC_INTERVAL` - Mirror reload interval in seconds (default: 60)
    /// - `REVOCATION_REAPER_INTERVAL` - Expired row purge interval in seconds (default: 3600)
    /// - `REVOCATION_STALENESS_THRESHOLD` - Mirror age before lookups hit the table, seconds (default: 120)
    /// - `RECONCILE_TIMEOUT_MS` - Bound on request-path table calls, milliseconds (default: 500)
    /// - `TOKEN_LIFETIME` - Token lifetime in seconds (default: 14400)
    /// - `REVOCATION_STORE_PATH` - SQLite revocation database (default: data/revocations.db)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let categories = env::var("CACHE_CATEGORIES")
            .ok()
            .map(|raw| CategoryRegistry::parse(&raw))
            .filter(|registry| !registry.is_empty())
            .unwrap_or(defaults.categories);

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            admin_port: env_or("ADMIN_PORT", defaults.admin_port),
            categories,
            revocation: RevocationConfig {
                sync_interval: env_secs(
                    "REVOCATION_SYNC_INTERVAL",
                    defaults.revocation.sync_interval,
                ),
                reaper_interval: env_secs(
                    "REVOCATION_REAPER_INTERVAL",
                    defaults.revocation.reaper_interval,
                ),
                staleness_threshold: env_secs(
                    "REVOCATION_STALENESS_THRESHOLD",
                    defaults.revocation.staleness_threshold,
                ),
                backend_timeout: env_millis(
                    "RECONCILE_TIMEOUT_MS",
                    defaults.revocation.backend_timeout,
                ),
            },
            token_lifetime: env_secs("TOKEN_LIFETIME", defaults.token_lifetime),
            revocation_store_path: env::var("REVOCATION_STORE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.revocation_store_path),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            admin_port: 3001,
            categories: CategoryRegistry::parse(DEFAULT_CATEGORIES),
            revocation: RevocationConfig::default(),
            token_lifetime: Duration::from_secs(4 * 60 * 60),
            revocation_store_path: PathBuf::from("data/revocations.db"),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Positive whole seconds, capped at one year; zero or garbage falls back to `default`.
fn env_secs(key: &str, default: Duration) -> Duration {
    env_positive(key)
        .map(|secs| Duration::from_secs(secs).min(MAX_PERIOD))
        .unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env_positive(key).map(Duration::from_millis).unwrap_or(default)
}

fn env_positive(key: &str) -> Option<u64> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|n| *n > 0)
}
