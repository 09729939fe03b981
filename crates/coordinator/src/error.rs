use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("coordinator rejected credentials")]
    Unauthorized,

    /// 409. On claim this means another node won the job.
    #[error("conflict")]
    Conflict,

    #[error("coordinator returned status {0}")]
    Server(u16),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid coordinator url: {0}")]
    InvalidUrl(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CoordinatorError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoordinatorError::Conflict)
    }

    pub(crate) fn from_status(status: u16) -> Self {
        match status {
            401 => CoordinatorError::Unauthorized,
            409 => CoordinatorError::Conflict,
            other => CoordinatorError::Server(other),
        }
    }
}
