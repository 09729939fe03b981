use async_trait::async_trait;

use edgeloop_core::{CapabilityDescriptor, Job, JobResult, JobType};

use crate::error::CoordinatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    /// The coordinator already knew this device. Treated as success.
    AlreadyRegistered,
}

/// The four coordinator operations the worker loop depends on.
///
/// Implementations must be safe to share across worker loops.
#[async_trait]
pub trait JobCoordinatorClient: Send + Sync {
    async fn register(
        &self,
        capabilities: &CapabilityDescriptor,
    ) -> Result<RegistrationOutcome, CoordinatorError>;

    /// Jobs currently offered for any of `supported`, in coordinator order.
    async fn fetch_jobs(&self, supported: &[JobType]) -> Result<Vec<Job>, CoordinatorError>;

    /// Claim a job. A [`CoordinatorError::Conflict`] means someone else got it.
    async fn claim_job(&self, job_id: &str) -> Result<Job, CoordinatorError>;

    async fn submit_result(&self, result: &JobResult) -> Result<(), CoordinatorError>;
}
