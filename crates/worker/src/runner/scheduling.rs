use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::WorkerError;

use super::{EdgeWorker, TickOutcome};

impl EdgeWorker {
    /// Start one tick loop per concurrent job slot. No-op if already running.
    pub fn start(self: &Arc<Self>) -> Result<(), WorkerError> {
        if !self.read_state(|s| s.is_registered) {
            return Err(WorkerError::NotRegistered);
        }
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("edge worker already running");
            return Ok(());
        }

        let generation = *self.generation.borrow();
        let slots = self.config.max_concurrent_jobs.max(1);
        let mut handles = Vec::with_capacity(slots);
        for slot in 0..slots {
            let worker = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                worker.run_loop(slot, generation).await;
            }));
        }
        self.loops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(handles);

        info!(
            slots,
            tick_interval = ?self.config.tick_interval(),
            "edge worker started"
        );
        Ok(())
    }

    /// Stop scheduling new work. A job already executing runs to completion
    /// (or its deadline) and its result is still submitted.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.generation.send_modify(|g| *g += 1);
        info!("edge worker stop requested");
    }

    /// Wait for every loop spawned by `start()` to finish its current tick
    /// and exit.
    pub async fn wait_stopped(&self) {
        let handles: Vec<_> = self
            .loops
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
        info!("edge worker stopped");
    }

    async fn run_loop(self: Arc<Self>, slot: usize, generation: u64) {
        let mut stop_rx = self.generation.subscribe();
        let interval = self.config.tick_interval();
        debug!(slot, "tick loop started");

        loop {
            if *stop_rx.borrow_and_update() != generation {
                break;
            }

            match self.tick().await {
                TickOutcome::Processed { job_id, status, .. } => {
                    debug!(slot, job_id = %job_id, status = %status, "tick processed a job");
                }
                other => debug!(slot, outcome = ?other, "tick finished"),
            }

            // Always sleep after a tick to bound the request rate; a stop
            // request cuts the sleep short.
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!(slot, "tick loop exited");
    }
}
