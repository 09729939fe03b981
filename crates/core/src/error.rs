use thiserror::Error;

use crate::job::JobStatus;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A job lifecycle transition that the state machine does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid transition for job {job_id}: {from} -> {to}")]
pub struct TransitionError {
    pub job_id: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown job type: {0}")]
pub struct ParseJobTypeError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown thermal level: {0}")]
pub struct ParseThermalLevelError(pub String);
