//! Actor error types.

use thiserror::Error;

/// Ways an actor can fail to produce a move.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActorError {
    /// No answer before the table's deadline.
    #[error("actor timed out")]
    Timeout,

    /// The actor ran but couldn't decide.
    #[error("actor failed: {0}")]
    Failed(String),

    /// The actor answered with something that isn't a move.
    #[error("malformed decision: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ActorError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}

/// Result type for actor calls
pub type ActorResult<T> = Result<T, ActorError>;
