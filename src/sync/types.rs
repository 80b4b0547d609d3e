//! Scheduler types

use crate::notify::DispatchOutcome;
use crate::plan::{UpdateInstruction, UpdatePlan};
use crate::price::FetchError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick
    Idle,
    /// A fetch, plan, dispatch cycle is in progress
    Running,
}

/// What one cycle did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Set when the fetch produced no quotes at all
    pub fetch_error: Option<FetchError>,
    /// Number of tokens with a valid quote
    pub quoted: usize,
    pub plan: UpdatePlan,
    /// One per planned instruction, same order
    pub outcomes: Vec<DispatchOutcome>,
}

impl CycleReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Applied))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, DispatchOutcome::Unchanged))
    }

    pub fn failed(&self) -> usize {
        self.count(DispatchOutcome::is_failure)
    }

    /// Instructions paired with their outcomes
    pub fn entries(&self) -> impl Iterator<Item = (&UpdateInstruction, &DispatchOutcome)> {
        self.plan.instructions.iter().zip(&self.outcomes)
    }

    fn count(&self, predicate: impl Fn(&DispatchOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}
