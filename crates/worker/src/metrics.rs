use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use edgeloop_core::JobType;

/// Per job type execution counters, used for statistics and for the
/// completion times advertised on re-registration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionMetrics {
    pub jobs_executed: BTreeMap<JobType, u64>,
    /// Running mean of wall-clock execution time, in seconds.
    pub avg_execution_seconds: BTreeMap<JobType, f64>,
    pub timeouts: BTreeMap<JobType, u64>,
    pub last_run: BTreeMap<JobType, DateTime<Utc>>,
}

impl ExecutionMetrics {
    pub fn record_execution(&mut self, job_type: JobType, duration: Duration) {
        let count = self.jobs_executed.entry(job_type).or_default();
        *count += 1;
        let count = *count;
        self.last_run.insert(job_type, Utc::now());

        // Incremental mean: new_avg = prev_avg + (x - prev_avg) / count
        let x = duration.as_secs_f64();
        let avg = self.avg_execution_seconds.entry(job_type).or_insert(x);
        if count > 1 {
            *avg += (x - *avg) / count as f64;
        }
    }

    pub fn record_timeout(&mut self, job_type: JobType) {
        *self.timeouts.entry(job_type).or_default() += 1;
    }
}
