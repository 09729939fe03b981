use thiserror::Error;

use edgeloop_coordinator::CoordinatorError;
use edgeloop_queue::QueueError;

use crate::executor::ExecutorError;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker is not registered with the coordinator")]
    NotRegistered,

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}
