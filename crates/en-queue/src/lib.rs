//! en-queue: external job queue with a bounded worker pool.
//!
//! Jobs are submitted against a [`JobDriver`] (production: [`ScriptDriver`],
//! which spawns the site job script as a child process). Every submission
//! gets a stable queue index; completion is reported as a [`QueueEvent`] on a
//! channel rather than through callbacks, so the dispatcher owns all member
//! state mutation.

pub mod driver;
pub mod queue;

pub use driver::{CancelToken, JobDriver, JobOutcome, JobSpec, ScriptDriver};
pub use queue::{JobQueue, JobStatus, QueueEvent, QueueIndex};

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(thiserror::Error, Debug)]
pub enum QueueError {
    #[error("Unknown queue index: {queue_index}")]
    UnknownJob { queue_index: usize },

    #[error("Job is not in a killable state: {status:?}")]
    NotKillable { status: queue::JobStatus },

    #[error("Job is not in a restartable state: {status:?}")]
    NotRestartable { status: queue::JobStatus },

    #[error("Queue has been shut down")]
    ShutDown,
}
