// error.rs - Errors raised by the bundled collaborators.
//
// Callers of the batch traits never see these directly: the store maps them
// to `SourceError` and the engine to `GoalEngineError`, keeping the message.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid member file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("goal engine command not found: {0}")]
    CommandNotFound(String),

    #[error("failed to launch goal engine {program}: {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("goal engine exited with {status} for member {member_id}: {stderr}")]
    EngineFailed {
        member_id: String,
        status: String,
        stderr: String,
    },

    #[error("unreadable goal engine reply for member {member_id}: {reason}")]
    BadReply { member_id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
