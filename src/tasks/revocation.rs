//! Revocation background tasks: mirror sync and expired-row reaper.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::revocation::RevocationStore;
use crate::tasks::ticker::spawn_periodic;
use crate::tasks::BackgroundTasks;

/// Reloads the mirror from the durable table every `sync_interval`.
///
/// Failures are logged by the store and the mirror is left as it was.
pub fn spawn_sync_task(store: Arc<RevocationStore>, tasks: &BackgroundTasks) -> JoinHandle<()> {
    let interval = store.config().sync_interval;
    spawn_periodic(
        "revocation-sync".to_string(),
        interval,
        tasks.subscribe(),
        move || {
            let store = Arc::clone(&store);
            async move {
                let _ = store.sync().await;
            }
        },
    )
}

/// Purges expired rows every `reaper_interval`, resyncing after each purge.
pub fn spawn_reaper_task(store: Arc<RevocationStore>, tasks: &BackgroundTasks) -> JoinHandle<()> {
    let interval = store.config().reaper_interval;
    spawn_periodic(
        "revocation-reaper".to_string(),
        interval,
        tasks.subscribe(),
        move || {
            let store = Arc::clone(&store);
            async move {
                let _ = store.reap().await;
            }
        },
    )
}
