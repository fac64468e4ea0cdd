//! Error types for action decoding, side effects and the task queue
//!
//! None of these ever reach the render loop: the state machine logs them and
//! carries on with the state it already has.

use thiserror::Error;

/// Rejected action coming from a UI layer
#[derive(Debug, Error)]
pub enum SelectError {
    /// The `type` field names no known action.
    #[error("unknown action type `{0}`")]
    UnknownAction(String),

    /// The payload does not fit the action's shape.
    #[error("malformed `{kind}` action: {source}")]
    MalformedAction {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// The text is not an action envelope at all.
    #[error("invalid action envelope: {0}")]
    InvalidEnvelope(#[from] serde_json::Error),
}

/// Failure reported by a side-effect implementation
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Failure of a single queued task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("side effect failed: {0}")]
    Effect(#[from] EffectError),

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("no Tokio runtime available to drive the task queue")]
    NoRuntime,

    #[error("task queue worker has stopped")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SelectError::UnknownAction("session start".into());
        assert!(err.to_string().contains("session start"));

        let err = TaskError::from(EffectError::Failed("disk full".into()));
        assert_eq!(err.to_string(), "side effect failed: disk full");

        assert!(QueueError::Closed.to_string().contains("stopped"));
    }
}
