//! Executor call raced against the job's hard deadline.

use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use edgeloop_core::{Job, JobResult, JobStatus};

use crate::executor::JobExecutor;

/// Terminal status plus the one result that will be submitted for the job.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub status: JobStatus,
    pub result: JobResult,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// Local failure for a claimed job that could not be run at all.
    pub fn failed_locally(job: &Job, message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            result: JobResult::failure(&job.id, message, Duration::ZERO),
            elapsed: Duration::ZERO,
        }
    }
}

/// Run `executor` on `job`, abandoning it once `deadline` elapses.
///
/// Whichever side finishes first decides the outcome. The losing future is
/// dropped on the spot, so a timed-out executor never produces a result.
pub async fn run_with_deadline(
    executor: &dyn JobExecutor,
    job: &Job,
    deadline: Duration,
) -> ExecutionOutcome {
    let started = Instant::now();

    let raced = tokio::select! {
        res = executor.execute(job) => Some(res),
        _ = tokio::time::sleep(deadline) => None,
    };
    let elapsed = started.elapsed();

    match raced {
        None => {
            warn!(job_id = %job.id, deadline = ?deadline, "job exceeded its deadline");
            ExecutionOutcome {
                status: JobStatus::Timeout,
                result: JobResult::failure(
                    &job.id,
                    format!("timed out after {}s", deadline.as_secs_f64()),
                    elapsed,
                ),
                elapsed,
            }
        }
        Some(Err(e)) => ExecutionOutcome {
            status: JobStatus::Failed,
            result: JobResult::failure(&job.id, e.to_string(), elapsed),
            elapsed,
        },
        Some(Ok(result)) => normalize(job, result, elapsed),
    }
}

/// Pin the result to this job, keep confidence in 0.0..=1.0 and make
/// `success`/`error_message` agree.
fn normalize(job: &Job, mut result: JobResult, elapsed: Duration) -> ExecutionOutcome {
    result.job_id = job.id.clone();
    result.confidence = result
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0));
    if result.execution_time_seconds.is_nan() || result.execution_time_seconds <= 0.0 {
        result.execution_time_seconds = elapsed.as_secs_f64();
    }
    let status = if result.success {
        result.error_message = None;
        JobStatus::Completed
    } else {
        result
            .error_message
            .get_or_insert_with(|| "executor reported failure".to_string());
        JobStatus::Failed
    };
    ExecutionOutcome {
        status,
        result,
        elapsed,
    }
}
