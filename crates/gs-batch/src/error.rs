// error.rs - Error types for the batch engine and its collaborators.
//
// Item-level problems never show up here: a Goal Engine failure becomes an
// `Outcome::Failed` inside the processor. These types only describe what can
// end a whole run (source/sink unavailable, pool trouble, bad config) plus
// the errors the collaborator traits report.

use thiserror::Error;

/// The Member Source could not produce the eligible-member list.
#[derive(Debug, Error)]
#[error("member source error: {message}")]
pub struct SourceError {
    pub message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The Goal Engine raised an error while scoring one member.
///
/// Only the human-readable message is kept; it ends up verbatim as the
/// `reason` of a `Failed` outcome.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GoalEngineError {
    pub message: String,
}

impl GoalEngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A metrics sink refused or failed to record an observation.
#[derive(Debug, Error)]
#[error("metrics sink error: {message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors raised by the bounded worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Queue full, every worker busy, and the rejection policy is `abort`.
    #[error("worker pool saturated: {workers} workers busy and {queued} jobs queued")]
    Saturated { workers: usize, queued: usize },

    /// The pool has been shut down and accepts no more work.
    #[error("worker pool is shut down")]
    ShutDown,

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread {name}: {source}")]
    Spawn {
        name: String,
        source: std::io::Error,
    },
}

/// Run-level errors. Any of these aborts the current run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The initial member fetch failed. Fatal to the run, never retried.
    #[error("member source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    /// The metrics sink behind the chunk writer is unavailable.
    #[error("metrics sink unavailable: {0}")]
    SinkUnavailable(#[source] SinkError),

    /// Item dispatch onto the worker pool failed.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A pooled job finished without reporting an outcome for its member.
    #[error("worker lost the outcome for member {member_id}")]
    WorkerLost { member_id: String },

    /// Configuration values that cannot drive a run.
    #[error("invalid batch configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, BatchError>;
