//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("queue item not found: {0}")]
    NotFound(uuid::Uuid),
}
