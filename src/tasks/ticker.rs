//! Periodic task runner with cooperative shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Longest period a task is scheduled with; longer ones are clamped.
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Spawns `job` every `period`, first run one period from now.
///
/// Shutdown is only observed between runs, so a run in progress always
/// completes; a stop never interrupts a half-applied mirror swap.
pub fn spawn_periodic<F, Fut>(
    name: String,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period > MAX_PERIOD {
        warn!(
            task = %name,
            requested_secs = period.as_secs(),
            "Task interval clamped to one year"
        );
    }
    let period = period.min(MAX_PERIOD);

    tokio::spawn(async move {
        let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
        let mut ticker = interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(task = %name, interval_secs = period.as_secs_f64(), "Starting background task");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    job().await;
                }
            }
        }

        debug!(task = %name, "Background task stopped");
    })
}

// == Background Tasks ==
/// Owns every spawned task and the shutdown signal they watch.
#[derive(Debug)]
pub struct BackgroundTasks {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
        }
    }

    /// A receiver for a new task to watch.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signals shutdown and waits for every task to finish its current run.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);

        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "Background task ended abnormally");
            }
        }
    }
}
