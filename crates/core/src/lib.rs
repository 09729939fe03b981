pub mod capability;
pub mod config;
pub mod error;
pub mod job;
pub mod result;
pub mod telemetry;
mod wire;

pub use capability::CapabilityDescriptor;
pub use config::{Config, CoordinatorConfig, ExecutorCommand, OutboxConfig, WorkerConfig};
pub use error::*;
pub use job::*;
pub use result::JobResult;
pub use telemetry::*;
