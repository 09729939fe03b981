use chrono::{DateTime, Utc};
use serde::Serialize;

use edgeloop_core::{ConnectionStatus, WorkerConfig};

use crate::cooldown::FailureCooldownPolicy;
use crate::metrics::ExecutionMetrics;
use crate::tracker::JobLifecycleTracker;

/// Everything the worker knows about its own session.
///
/// Only the worker mutates it. Observers get a clone via
/// [`EdgeWorker::snapshot`](crate::EdgeWorker::snapshot).
#[derive(Debug, Clone, Serialize)]
pub struct WorkerState {
    pub(crate) is_registered: bool,
    pub(crate) connection: ConnectionStatus,
    pub(crate) tracker: JobLifecycleTracker,
    pub(crate) cooldown: FailureCooldownPolicy,
    pub(crate) metrics: ExecutionMetrics,
    pub(crate) last_error: Option<String>,
}

impl WorkerState {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            is_registered: false,
            connection: ConnectionStatus::Disconnected,
            tracker: JobLifecycleTracker::new(config.history_limit),
            cooldown: FailureCooldownPolicy::new(
                config.max_consecutive_failures,
                config.cooldown_window(),
            ),
            metrics: ExecutionMetrics::default(),
            last_error: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.is_registered
    }

    pub fn is_processing(&self) -> bool {
        self.tracker.is_processing()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn tracker(&self) -> &JobLifecycleTracker {
        &self.tracker
    }

    pub fn cooldown(&self) -> &FailureCooldownPolicy {
        &self.cooldown
    }

    pub fn metrics(&self) -> &ExecutionMetrics {
        &self.metrics
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.cooldown.consecutive_failures()
    }

    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown.cooldown_until()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Count a failure toward cooldown and remember it as the last error.
    pub(crate) fn record_failure(&mut self, message: String, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.last_error = Some(message);
        self.cooldown.record_failure(now)
    }
}

/// Flat summary for status lines and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatistics {
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_credits_earned: u64,
    pub is_processing: bool,
    pub current_job_ids: Vec<String>,
    pub is_eligible: bool,
    pub connection: ConnectionStatus,
    pub consecutive_failures: u32,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
