//! Edge worker runner -- ticks, claims, executes and reports jobs.
//!
//! Split into focused submodules:
//! - `core`: EdgeWorker struct, constructor, registration, and state accessors
//! - `scheduling`: start/stop and the per-slot tick loops
//! - `execution`: one tick: gate, fetch, claim, deadline race, submit

mod core;
mod execution;
mod scheduling;
#[cfg(test)]
mod tests;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use edgeloop_core::{JobResult, JobStatus};

use crate::eligibility::Ineligibility;

pub use self::core::EdgeWorker;

/// Coordinator call that failed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStage {
    Fetch,
    Claim,
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickStage::Fetch => f.write_str("fetch"),
            TickStage::Claim => f.write_str("claim"),
        }
    }
}

/// What a single tick did. Every variant ends the tick; the loop then
/// sleeps for the tick interval.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    NotRegistered,
    CoolingDown { until: DateTime<Utc> },
    Ineligible(Ineligibility),
    /// Nothing offered that this node can run.
    NoJobs,
    /// Another node claimed the job first. Not a failure.
    ClaimConflict { job_id: String },
    CoordinatorFailure { stage: TickStage },
    Processed {
        job_id: String,
        status: JobStatus,
        /// Whether the coordinator acknowledged the result.
        submitted: bool,
    },
}

/// A result waiting in the outbox, with the credits it earns once accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub result: JobResult,
    #[serde(default)]
    pub reward_credits: u64,
}
