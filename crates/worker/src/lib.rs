//! Edge worker: decides when this device may take work, claims and runs
//! jobs under a hard deadline, and backs off after repeated failures.

pub mod cooldown;
pub mod deadline;
pub mod eligibility;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod runner;
pub mod state;
pub mod telemetry;
pub mod tracker;

pub use cooldown::FailureCooldownPolicy;
pub use eligibility::{EligibilityInput, Ineligibility, ResourceEligibilityGate};
pub use error::WorkerError;
pub use executor::{ExecutorError, ExecutorRegistry, JobExecutor, ProcessExecutor};
pub use metrics::ExecutionMetrics;
pub use runner::{EdgeWorker, PendingSubmission, TickOutcome, TickStage};
pub use state::{JobStatistics, WorkerState};
pub use telemetry::{StaticTelemetry, SysfsTelemetry, TelemetrySource};
pub use tracker::JobLifecycleTracker;
