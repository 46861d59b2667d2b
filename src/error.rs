use std::sync::Arc;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by state evaluation, mutation and composition.
///
/// `Error` is `Clone` because a failed evaluation is cached in the node and
/// handed back to every later reader, and because pending values are shared
/// between all of their awaiters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// `set()` (or a step that writes) was called while an evaluator was running.
    #[error("cannot change state inside other state")]
    SetDuringEvaluation,

    /// A state read itself, directly or through other states, while evaluating.
    #[error("state depends on itself")]
    Cycle,

    /// The cursor of this state is already being stepped.
    #[error("state is already being stepped")]
    Busy,

    /// A composition input is not a usable state handle.
    #[error("invalid input state: {0}")]
    InvalidState(Arc<str>),

    /// `last()` was called on an action-driven state.
    #[error("action-driven state has no terminal value")]
    NoTerminalValue,

    /// The value is still pending.
    #[error("state value is pending")]
    Pending,

    /// The state has been evaluated but holds no value.
    #[error("state has no value")]
    Empty,

    /// A drain or chained computation observed its cancellation token.
    #[error("cancelled")]
    Cancelled,

    /// An evaluator failed with a plain message.
    #[error("{0}")]
    Message(Arc<str>),

    /// An evaluator failed with an underlying error.
    #[error(transparent)]
    Evaluation(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Evaluation failure carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Message(Arc::from(message.into()))
    }

    /// Evaluation failure wrapping another error.
    pub fn evaluation<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Evaluation(Arc::new(error))
    }

    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        Error::InvalidState(Arc::from(reason.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let io = std::io::Error::other("disk gone");
        let err = Error::evaluation(io);
        assert_eq!(err.to_string(), "disk gone");

        let cloned = err.clone();
        assert_eq!(cloned.to_string(), "disk gone");
    }

    #[test]
    fn invalid_state_names_the_input() {
        let err = Error::invalid_state("source belongs to another runtime");
        assert_eq!(
            err.to_string(),
            "invalid input state: source belongs to another runtime"
        );
    }
}
