//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL sweep: one per cache category, evicts expired entries
//! - Revocation sync: reloads the in-memory mirror from the durable table
//! - Revocation reaper: purges expired rows, then resyncs

mod revocation;
mod sweep;
mod ticker;

pub use revocation::{spawn_reaper_task, spawn_sync_task};
pub use sweep::{spawn_sweep_task, spawn_sweep_tasks};
pub use ticker::{spawn_periodic, BackgroundTasks, MAX_PERIOD};
