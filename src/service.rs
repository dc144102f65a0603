//! Service lifecycle: the cache, the revocation store and their background tasks.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::config::Config;
use crate::revocation::{RevocationBackend, RevocationStore};
use crate::tasks::{spawn_reaper_task, spawn_sweep_tasks, spawn_sync_task, BackgroundTasks};

/// Owns the shared components and starts or stops their background tasks.
#[derive(Debug)]
pub struct GuardService {
    cache: TtlCache,
    revocations: Arc<RevocationStore>,
    tasks: Option<BackgroundTasks>,
}

impl GuardService {
    pub fn new(config: &Config, backend: Arc<dyn RevocationBackend>) -> Self {
        Self {
            cache: TtlCache::new(&config.categories),
            revocations: Arc::new(RevocationStore::new(backend, config.revocation)),
            tasks: None,
        }
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn revocations(&self) -> &Arc<RevocationStore> {
        &self.revocations
    }

    pub fn is_running(&self) -> bool {
        self.tasks.is_some()
    }

    /// Loads the revocation mirror, then starts the sweepers, the sync task
    /// and the reaper. Calling it twice is a no-op.
    ///
    /// A failed initial load is logged; the mirror stays never-synced, so
    /// lookups reconcile against the table until the first sync succeeds.
    pub async fn start(&mut self) {
        if self.tasks.is_some() {
            return;
        }

        match self.revocations.sync().await {
            Ok(entries) => info!(entries, "Revocation mirror loaded"),
            Err(err) => warn!(error = %err, "Initial revocation load failed"),
        }

        let mut tasks = BackgroundTasks::new();
        spawn_sweep_tasks(&self.cache, &mut tasks);
        let sync = spawn_sync_task(Arc::clone(&self.revocations), &tasks);
        tasks.push(sync);
        let reaper = spawn_reaper_task(Arc::clone(&self.revocations), &tasks);
        tasks.push(reaper);

        info!(tasks = tasks.len(), "Background tasks started");
        self.tasks = Some(tasks);
    }

    /// Stops every background task, waiting for in-flight runs to finish.
    pub async fn stop(&mut self) {
        if let Some(tasks) = self.tasks.take() {
            tasks.stop().await;
            info!("Background tasks stopped");
        }
    }
}
