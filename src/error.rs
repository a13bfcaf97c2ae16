//! Error taxonomy for action invocations.
//!
//! Every failure an action can hit maps onto one of four classes, and all of
//! them surface to the caller the same way: a `Fail` outcome with a
//! human-readable message and exit code 1. Nothing is retried and nothing is
//! swallowed; retry policy belongs to whatever orchestrator re-invokes the
//! action.

use thiserror::Error;

/// Failure classes for a single action invocation.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The input document on stdin was not a JSON object.
    #[error("the input provided could not be parsed")]
    InputDecode,

    /// An argument was unsupported, missing, of the wrong type or not one of
    /// the allowed choices.
    #[error("{0}")]
    Argument(String),

    /// The current state could not be determined or the desired state could
    /// not be achieved.
    #[error("{0}")]
    Execution(String),

    /// An external executable could not be located or started.
    #[error("unable to find executable for command {0}")]
    ExecutableMissing(String),
}

impl ActionError {
    /// Build an [`ActionError::Argument`] from anything displayable.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Build an [`ActionError::Execution`] from anything displayable.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_decode_message_is_stable() {
        assert_eq!(
            ActionError::InputDecode.to_string(),
            "the input provided could not be parsed"
        );
    }

    #[test]
    fn executable_missing_names_the_command() {
        let err = ActionError::ExecutableMissing("rsync --archive".to_string());
        assert_eq!(
            err.to_string(),
            "unable to find executable for command rsync --archive"
        );
    }

    #[test]
    fn argument_and_execution_pass_message_through() {
        assert_eq!(
            ActionError::argument("mandatory argument 'path' was not provided").to_string(),
            "mandatory argument 'path' was not provided"
        );
        assert_eq!(
            ActionError::execution("unable to determine checksum of file").to_string(),
            "unable to determine checksum of file"
        );
    }
}
