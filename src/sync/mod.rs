//! Synchronization loop
//!
//! Drives fetch, plan and dispatch once at startup and then on a fixed
//! interval until shutdown.

mod scheduler;
mod types;

pub use scheduler::SyncScheduler;
pub use types::{CycleReport, SchedulerState};
