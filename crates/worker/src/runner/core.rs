use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use edgeloop_coordinator::{JobCoordinatorClient, RegistrationOutcome};
use edgeloop_core::{CapabilityDescriptor, ConnectionStatus, DeviceTelemetry, WorkerConfig};
use edgeloop_queue::DurableQueue;

use crate::eligibility::{EligibilityInput, ResourceEligibilityGate};
use crate::error::WorkerError;
use crate::executor::ExecutorRegistry;
use crate::state::{JobStatistics, WorkerState};
use crate::telemetry::TelemetrySource;

use super::PendingSubmission;

/// One edge worker session: owns its state, gate and cooldown policy, and
/// talks to the coordinator through an injected client.
///
/// Share it as `Arc<EdgeWorker>`; [`EdgeWorker::start`] spawns one tick loop
/// per concurrent job slot.
pub struct EdgeWorker {
    pub(super) config: WorkerConfig,
    pub(super) capabilities: RwLock<CapabilityDescriptor>,
    pub(super) coordinator: Arc<dyn JobCoordinatorClient>,
    pub(super) executors: ExecutorRegistry,
    pub(super) telemetry: Arc<dyn TelemetrySource>,
    pub(super) gate: ResourceEligibilityGate,
    pub(super) state: RwLock<WorkerState>,
    /// Retry queue for unacknowledged results, when enabled.
    pub(super) outbox: Option<Arc<DurableQueue<PendingSubmission>>>,
    pub(super) running: AtomicBool,
    /// Bumped on every `stop()`; loops exit once it moves past their start value.
    pub(super) generation: watch::Sender<u64>,
    pub(super) loops: Mutex<Vec<JoinHandle<()>>>,
    /// Network reachability seen on the previous tick.
    pub(super) network_was_reachable: AtomicBool,
}

impl EdgeWorker {
    /// Build a worker. Supported job types are taken from `executors`.
    pub fn new(
        config: WorkerConfig,
        coordinator: Arc<dyn JobCoordinatorClient>,
        executors: ExecutorRegistry,
        telemetry: Arc<dyn TelemetrySource>,
    ) -> Self {
        let capabilities = CapabilityDescriptor::for_host(
            config.resolved_device_id(),
            executors.job_types(),
            config.max_concurrent_jobs,
        );
        let (generation, _) = watch::channel(0);
        Self {
            gate: ResourceEligibilityGate::from_config(&config),
            state: RwLock::new(WorkerState::new(&config)),
            capabilities: RwLock::new(capabilities),
            config,
            coordinator,
            executors,
            telemetry,
            outbox: None,
            running: AtomicBool::new(false),
            generation,
            loops: Mutex::new(Vec::new()),
            network_was_reachable: AtomicBool::new(true),
        }
    }

    /// Route unacknowledged results through a durable queue.
    pub fn with_outbox(mut self, outbox: Arc<DurableQueue<PendingSubmission>>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Replace the generated capability descriptor (e.g. to add hardware
    /// details). Supported job types are still those of the registry.
    pub fn with_capabilities(self, mut capabilities: CapabilityDescriptor) -> Self {
        capabilities.supported_job_types = self.executors.job_types();
        *self.capabilities.write().unwrap_or_else(|e| e.into_inner()) = capabilities;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn executors(&self) -> &ExecutorRegistry {
        &self.executors
    }

    pub fn outbox(&self) -> Option<&Arc<DurableQueue<PendingSubmission>>> {
        self.outbox.as_ref()
    }

    pub fn capabilities(&self) -> CapabilityDescriptor {
        self.capabilities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Announce this node to the coordinator.
    ///
    /// "Already registered" counts as success. Must succeed before
    /// [`EdgeWorker::start`] is allowed.
    pub async fn register(&self) -> Result<RegistrationOutcome, WorkerError> {
        self.write_state(|s| s.connection = ConnectionStatus::Connecting);

        let capabilities = {
            let averages = self.read_state(|s| s.metrics.avg_execution_seconds.clone());
            let mut caps = self.capabilities.write().unwrap_or_else(|e| e.into_inner());
            caps.avg_completion_time.extend(averages);
            caps.touch(Utc::now(), true);
            caps.clone()
        };

        match self.coordinator.register(&capabilities).await {
            Ok(outcome) => {
                self.write_state(|s| {
                    s.is_registered = true;
                    s.connection = ConnectionStatus::Connected;
                });
                info!(
                    device_id = %capabilities.device_id,
                    job_types = ?capabilities.supported_job_types,
                    outcome = ?outcome,
                    "edge worker registered"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "registration failed");
                let now = Utc::now();
                self.write_state(|s| {
                    s.connection = ConnectionStatus::Error;
                    s.record_failure(format!("register: {e}"), now);
                });
                Err(e.into())
            }
        }
    }

    /// Flat summary for status output. Eligibility is evaluated against the
    /// current telemetry.
    pub fn statistics(&self) -> JobStatistics {
        let telemetry = self.telemetry.current();
        self.read_state(|s| JobStatistics {
            total_completed: s.tracker.total_completed(),
            total_failed: s.tracker.total_failed(),
            total_credits_earned: s.tracker.total_credits_earned(),
            is_processing: s.tracker.is_processing(),
            current_job_ids: s.tracker.current_jobs().iter().map(|j| j.id.clone()).collect(),
            is_eligible: self.gate.is_eligible(&self.eligibility_input(s, &telemetry)),
            connection: s.connection,
            consecutive_failures: s.cooldown.consecutive_failures(),
            cooldown_until: s.cooldown.cooldown_until(),
            last_error: s.last_error.clone(),
        })
    }

    /// Immutable copy of the whole worker state.
    pub fn snapshot(&self) -> WorkerState {
        self.read_state(|s| s.clone())
    }

    /// Forget completed/failed history. Totals and credits stay.
    pub fn clear_history(&self) {
        self.write_state(|s| s.tracker.clear_history());
    }

    /// Gate input from state plus telemetry. The node only counts as
    /// connected while both registration and the network are up.
    pub(super) fn eligibility_input(
        &self,
        state: &WorkerState,
        telemetry: &DeviceTelemetry,
    ) -> EligibilityInput {
        let connection = if telemetry.network_reachable {
            state.connection
        } else {
            ConnectionStatus::Disconnected
        };
        EligibilityInput {
            battery_fraction: telemetry.battery_fraction,
            thermal: telemetry.thermal,
            connection,
            in_flight: state.tracker.in_flight(),
        }
    }

    pub(super) fn read_state<R>(&self, f: impl FnOnce(&WorkerState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&*state)
    }

    pub(super) fn write_state<R>(&self, f: impl FnOnce(&mut WorkerState) -> R) -> R {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        f(&mut *state)
    }
}
