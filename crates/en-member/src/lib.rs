//! en-member: per-realization run controllers and result internalization.
//!
//! One [`MemberController`] exists per ensemble member. It owns the member's
//! variable nodes and random stream, prepares the run directory, submits the
//! forward model to the queue, and reacts to completion events with either
//! internalization (on success) or the bounded internal-retry path (on
//! failure). [`EnsembleDriver`] fans controllers out over the queue and
//! routes completion events back to them.

pub mod controller;
pub mod driver;
pub mod internalize;
pub mod nodes;
pub mod run_info;
pub mod shared;

pub use controller::MemberController;
pub use driver::{EnsembleDriver, EnsembleReport};
pub use internalize::{LoadReport, load_results};
pub use nodes::{EnsembleNode, NodeHash, ParamSpec, VarKind};
pub use run_info::{RunInfo, RunInit, RunMode, RunPathState, RunStatus};
pub use shared::SharedInfo;

pub type MemberResult<T> = Result<T, MemberError>;

#[derive(thiserror::Error, Debug)]
pub enum MemberError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] en_config::ConfigError),

    #[error("Record error: {0}")]
    Ecl(#[from] en_ecl::EclError),

    #[error("Summary error: {0}")]
    Smspec(#[from] en_smspec::SmspecError),

    #[error("Queue error: {0}")]
    Queue(#[from] en_queue::QueueError),

    #[error("Unknown node key: {key}")]
    NodeNotFound { key: String },

    #[error("init_run has not been called for this member")]
    NotInitialized,

    #[error("member has no submitted job")]
    NotSubmitted,

    #[error("invalid run window: {reason}")]
    InvalidRunWindow { reason: String },
}
