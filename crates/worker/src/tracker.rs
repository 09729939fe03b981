//! In-memory record of what the worker is doing and has done.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use edgeloop_core::{Job, JobStatus, TransitionError};

/// Current jobs, bounded history, totals and credits.
///
/// A slot is reserved before the claim request goes out so that concurrent
/// loops can never hold more than `max_concurrent_jobs` jobs between them.
#[derive(Debug, Clone, Serialize)]
pub struct JobLifecycleTracker {
    current: Vec<Job>,
    reserved: usize,
    completed: VecDeque<Job>,
    failed: VecDeque<Job>,
    total_completed: u64,
    total_failed: u64,
    total_credits_earned: u64,
    history_limit: usize,
}

impl JobLifecycleTracker {
    pub fn new(history_limit: usize) -> Self {
        Self {
            current: Vec::new(),
            reserved: 0,
            completed: VecDeque::new(),
            failed: VecDeque::new(),
            total_completed: 0,
            total_failed: 0,
            total_credits_earned: 0,
            history_limit,
        }
    }

    /// Jobs claimed or executing, plus outstanding reservations.
    pub fn in_flight(&self) -> usize {
        self.current.len() + self.reserved
    }

    pub fn is_processing(&self) -> bool {
        !self.current.is_empty()
    }

    /// Take a slot ahead of a claim. Fails when all `max` slots are in use.
    pub fn reserve_slot(&mut self, max: usize) -> bool {
        if self.in_flight() >= max {
            return false;
        }
        self.reserved += 1;
        true
    }

    /// Give back a reservation that did not turn into a job.
    pub fn release_slot(&mut self) {
        self.reserved = self.reserved.saturating_sub(1);
    }

    /// Turn a reservation into an owned, claimed job.
    pub fn begin(&mut self, mut job: Job, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.release_slot();
        job.mark_claimed(at)?;
        self.current.push(job);
        Ok(())
    }

    pub fn start_executing(&mut self, job_id: &str, at: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.current.iter_mut().find(|j| j.id == job_id) {
            Some(job) => job.start_executing(at),
            None => Ok(()),
        }
    }

    /// Move a current job to its terminal state and into history.
    ///
    /// Returns `None` if the job is no longer current: a job's terminal
    /// state is assigned once and later calls are ignored.
    pub fn finish(&mut self, job_id: &str, status: JobStatus, at: DateTime<Utc>) -> Option<Job> {
        let idx = self.current.iter().position(|j| j.id == job_id)?;
        let mut job = self.current.remove(idx);
        if let Err(e) = job.finish(status, at) {
            warn!(job_id, error = %e, "forcing terminal state");
            job.status = status;
            job.claimed_at.get_or_insert(at);
            job.completed_at = Some(at);
        }

        if status == JobStatus::Completed {
            self.total_completed += 1;
            push_capped(&mut self.completed, job.clone(), self.history_limit);
        } else {
            self.total_failed += 1;
            push_capped(&mut self.failed, job.clone(), self.history_limit);
        }
        Some(job)
    }

    pub fn add_credits(&mut self, credits: u64) {
        self.total_credits_earned = self.total_credits_earned.saturating_add(credits);
    }

    pub fn current_jobs(&self) -> &[Job] {
        &self.current
    }

    pub fn completed_jobs(&self) -> impl Iterator<Item = &Job> {
        self.completed.iter()
    }

    pub fn failed_jobs(&self) -> impl Iterator<Item = &Job> {
        self.failed.iter()
    }

    pub fn total_completed(&self) -> u64 {
        self.total_completed
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed
    }

    pub fn total_credits_earned(&self) -> u64 {
        self.total_credits_earned
    }

    /// Drop completed/failed history. Totals and credits are kept.
    pub fn clear_history(&mut self) {
        self.completed.clear();
        self.failed.clear();
    }
}

fn push_capped(history: &mut VecDeque<Job>, job: Job, limit: usize) {
    history.push_back(job);
    while history.len() > limit {
        history.pop_front();
    }
}
