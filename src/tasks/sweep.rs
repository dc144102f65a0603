//! TTL Sweep Tasks
//!
//! One background task per cache category that periodically evicts expired
//! entries, in addition to the lazy expiry check on every lookup.

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::tasks::BackgroundTasks;
use crate::tasks::ticker::spawn_periodic;

/// Spawns the sweeper for one category on its configured interval.
pub fn spawn_sweep_task(
    cache: TtlCache,
    category: String,
    tasks: &BackgroundTasks,
) -> Option<JoinHandle<()>> {
    let interval = cache
        .categories()
        .find(|(name, _)| *name == category)
        .map(|(_, config)| config.sweep_interval)?;

    let task_name = format!("sweep:{category}");
    Some(spawn_periodic(task_name, interval, tasks.subscribe(), move || {
        let cache = cache.clone();
        let category = category.clone();
        async move {
            let removed = cache.sweep(&category);
            if removed > 0 {
                info!(category = %category, removed, "TTL sweep: removed expired entries");
            } else {
                debug!(category = %category, "TTL sweep: no expired entries found");
            }
        }
    }))
}

/// Spawns a sweeper for every registered category.
pub fn spawn_sweep_tasks(cache: &TtlCache, tasks: &mut BackgroundTasks) {
    let categories: Vec<String> = cache.categories().map(|(name, _)| name.to_string()).collect();

    for category in categories {
        if let Some(handle) = spawn_sweep_task(cache.clone(), category, tasks) {
            tasks.push(handle);
        }
    }
}
