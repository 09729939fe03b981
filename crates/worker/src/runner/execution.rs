use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use edgeloop_coordinator::CoordinatorError;
use edgeloop_core::{Job, JobResult, JobStatus};
use edgeloop_queue::OutboundSender;

use crate::deadline::{run_with_deadline, ExecutionOutcome};
use crate::eligibility::Ineligibility;

use super::{EdgeWorker, PendingSubmission, TickOutcome, TickStage};

impl EdgeWorker {
    /// Run one pass of the loop: cooldown, eligibility, fetch, claim,
    /// execute under the deadline, record, submit.
    ///
    /// Never fails; every problem ends up in the worker state and the
    /// returned [`TickOutcome`].
    pub async fn tick(&self) -> TickOutcome {
        if !self.read_state(|s| s.is_registered) {
            return TickOutcome::NotRegistered;
        }

        let now = Utc::now();
        if let Some(until) = self.read_state(|s| s.cooldown.active_until(now)) {
            debug!(until = %until, "cooling down, skipping tick");
            return TickOutcome::CoolingDown { until };
        }

        let telemetry = self.telemetry.current();
        let was_reachable = self
            .network_was_reachable
            .swap(telemetry.network_reachable, Ordering::AcqRel);
        let mut flushed = false;
        if telemetry.network_reachable && !was_reachable {
            info!("network reachable again");
            self.flush_outbox().await;
            flushed = true;
        }

        let input = self.read_state(|s| self.eligibility_input(s, &telemetry));
        if let Err(reason) = self.gate.check(&input) {
            debug!(reason = %reason, "not eligible, skipping tick");
            return TickOutcome::Ineligible(reason);
        }

        if !flushed {
            self.flush_outbox().await;
        }

        let offered = match self.coordinator.fetch_jobs(&self.executors.job_types()).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "fetching jobs failed");
                self.record_failure(format!("fetch: {e}"));
                return TickOutcome::CoordinatorFailure {
                    stage: TickStage::Fetch,
                };
            }
        };

        // Coordinator order is authoritative: take the first runnable job.
        let Some(candidate) = offered
            .into_iter()
            .find(|job| self.executors.supports(job.job_type))
        else {
            debug!("no runnable jobs offered");
            return TickOutcome::NoJobs;
        };

        let max = self.config.max_concurrent_jobs;
        if !self.write_state(|s| s.tracker.reserve_slot(max)) {
            let in_flight = self.read_state(|s| s.tracker.in_flight());
            return TickOutcome::Ineligible(Ineligibility::AtCapacity { in_flight, max });
        }

        let job = match self.coordinator.claim_job(&candidate.id).await {
            Ok(job) => job,
            Err(e) if e.is_conflict() => {
                self.write_state(|s| s.tracker.release_slot());
                debug!(job_id = %candidate.id, "job claimed by another worker");
                return TickOutcome::ClaimConflict {
                    job_id: candidate.id,
                };
            }
            Err(e) => {
                warn!(job_id = %candidate.id, error = %e, "claiming job failed");
                self.write_state(|s| s.tracker.release_slot());
                self.record_failure(format!("claim {}: {e}", candidate.id));
                return TickOutcome::CoordinatorFailure {
                    stage: TickStage::Claim,
                };
            }
        };

        let claimed_at = Utc::now();
        if let Err(e) = self.write_state(|s| s.tracker.begin(job.clone(), claimed_at)) {
            warn!(job_id = %job.id, error = %e, "coordinator returned a job in an unexpected state");
            self.record_failure(format!("claim {}: {e}", job.id));
            // The claim went through, so the coordinator still expects a result.
            let result =
                JobResult::failure(&job.id, format!("claimed job rejected: {e}"), Duration::ZERO);
            let submitted = self.submit(result, job.reward_credits).await;
            return TickOutcome::Processed {
                job_id: job.id,
                status: JobStatus::Failed,
                submitted,
            };
        }
        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            reward = job.reward_credits,
            "job claimed"
        );

        let outcome = self.execute(&job).await;
        self.record_outcome(&job, &outcome);

        let reward = job.reward_credits;
        let submitted = self.submit(outcome.result, reward).await;

        TickOutcome::Processed {
            job_id: job.id,
            status: outcome.status,
            submitted,
        }
    }

    /// Deliver everything waiting in the outbox, oldest first.
    pub async fn flush_outbox(&self) {
        let Some(outbox) = self.outbox.as_ref() else {
            return;
        };
        if outbox.pending_count() == 0 {
            return;
        }
        if let Err(e) = outbox.flush(self).await {
            warn!(error = %e, "outbox flush failed");
        }
    }

    async fn execute(&self, job: &Job) -> ExecutionOutcome {
        let Some(executor) = self.executors.get(job.job_type) else {
            warn!(job_id = %job.id, job_type = %job.job_type, "claimed job has no executor");
            return ExecutionOutcome::failed_locally(
                job,
                format!("no executor registered for job type '{}'", job.job_type),
            );
        };

        let started_at = Utc::now();
        if let Err(e) = self.write_state(|s| s.tracker.start_executing(&job.id, started_at)) {
            warn!(job_id = %job.id, error = %e, "cannot start job");
            return ExecutionOutcome::failed_locally(job, e.to_string());
        }

        let deadline = job.deadline(self.config.default_job_timeout());
        debug!(job_id = %job.id, deadline = ?deadline, "executing job");
        run_with_deadline(executor.as_ref(), job, deadline).await
    }

    /// Apply the terminal status to the state, exactly once per job.
    fn record_outcome(&self, job: &Job, outcome: &ExecutionOutcome) {
        let now = Utc::now();
        let message = outcome
            .result
            .error_message
            .clone()
            .unwrap_or_else(|| outcome.status.to_string());

        let (recorded, cooldown_until, average) = self.write_state(|s| {
            if s.tracker.finish(&job.id, outcome.status, now).is_none() {
                return (false, None, None);
            }
            let mut until = None;
            if outcome.is_success() {
                s.cooldown.record_success();
                s.metrics.record_execution(job.job_type, outcome.elapsed);
            } else {
                if outcome.status == JobStatus::Timeout {
                    s.metrics.record_timeout(job.job_type);
                }
                until = s.record_failure(format!("job {}: {message}", job.id), now);
            }
            let average = s.metrics.avg_execution_seconds.get(&job.job_type).copied();
            (true, until, average)
        });

        if !recorded {
            warn!(job_id = %job.id, "job already finished, ignoring late outcome");
            return;
        }

        if let Some(avg) = average {
            self.capabilities
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .avg_completion_time
                .insert(job.job_type, avg);
        }

        if outcome.is_success() {
            info!(
                job_id = %job.id,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "job completed"
            );
        } else {
            warn!(job_id = %job.id, status = %outcome.status, error = %message, "job failed");
        }
        if let Some(until) = cooldown_until {
            warn!(until = %until, "too many consecutive failures, cooling down");
        }
    }

    /// Send the result. Returns whether the coordinator acknowledged it.
    async fn submit(&self, result: JobResult, reward_credits: u64) -> bool {
        let job_id = result.job_id.clone();
        match self.coordinator.submit_result(&result).await {
            Ok(()) => {
                if result.success {
                    self.write_state(|s| s.tracker.add_credits(reward_credits));
                }
                debug!(job_id = %job_id, "result submitted");
                true
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "submitting result failed");
                self.record_failure(format!("submit {job_id}: {e}"));
                if let Some(outbox) = self.outbox.as_ref() {
                    let pending = PendingSubmission {
                        result,
                        reward_credits,
                    };
                    match outbox.enqueue(pending) {
                        Ok(id) => info!(job_id = %job_id, item_id = %id, "result queued for retry"),
                        Err(e) => warn!(job_id = %job_id, error = %e, "could not queue result"),
                    }
                }
                false
            }
        }
    }

    fn record_failure(&self, message: String) {
        let now = Utc::now();
        if let Some(until) = self.write_state(|s| s.record_failure(message, now)) {
            warn!(until = %until, "too many consecutive failures, cooling down");
        }
    }
}

#[async_trait]
impl OutboundSender<PendingSubmission> for EdgeWorker {
    type Error = CoordinatorError;

    async fn send(&self, payload: &PendingSubmission) -> Result<(), Self::Error> {
        self.coordinator.submit_result(&payload.result).await?;
        if payload.result.success {
            self.write_state(|s| s.tracker.add_credits(payload.reward_credits));
        }
        Ok(())
    }
}
