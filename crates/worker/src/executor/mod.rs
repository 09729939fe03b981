//! Pluggable job executors, one per job type.

mod process;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use edgeloop_core::{Job, JobResult, JobType};

pub use self::process::ProcessExecutor;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("execution failed: {0}")]
    Failed(String),

    #[error("invalid job input: {0}")]
    InvalidInput(String),

    #[error("no executor registered for job type '{0}'")]
    Unsupported(JobType),

    #[error("an executor for job type '{0}' is already registered")]
    Duplicate(JobType),

    #[error("executor I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a [`Job`] into a [`JobResult`] for one job type.
///
/// An `Err` is treated exactly like a `success: false` result. The future
/// may be dropped at any await point when the job's deadline fires.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    fn job_type(&self) -> JobType;

    async fn execute(&self, job: &Job) -> Result<JobResult, ExecutorError>;
}

/// `JobType -> JobExecutor` map, fixed once the worker is built.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    executors: BTreeMap<JobType, Arc<dyn JobExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor. Rejects duplicates and the `unknown` type.
    pub fn register(&mut self, executor: Arc<dyn JobExecutor>) -> Result<(), ExecutorError> {
        let job_type = executor.job_type();
        if job_type == JobType::Unknown {
            return Err(ExecutorError::Unsupported(job_type));
        }
        if self.executors.contains_key(&job_type) {
            return Err(ExecutorError::Duplicate(job_type));
        }
        self.executors.insert(job_type, executor);
        Ok(())
    }

    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn JobExecutor>> {
        self.executors.get(&job_type).cloned()
    }

    pub fn supports(&self, job_type: JobType) -> bool {
        self.executors.contains_key(&job_type)
    }

    /// Registered job types in stable order.
    pub fn job_types(&self) -> Vec<JobType> {
        self.executors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.executors.keys()).finish()
    }
}
