//! Attempt error types
//!
//! Every failure mode of a single execution attempt, classified so the
//! scheduler can tell "still waiting on a gate" apart from "genuinely
//! failed".

use std::time::Duration;

use thiserror::Error;

use crate::actions::ActionError;

/// Errors that can end one attempt of a job
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Execution time exceeded ({budget:?})")]
    Timeout { budget: Duration },

    #[error("Dependency '{action}' cannot be run yet")]
    DependencyNotReady { action: String },

    #[error("Dependency '{action}' failed")]
    DependencyFailed { action: String },

    #[error("Unknown action: {name}")]
    UnknownAction { name: String },

    #[error(transparent)]
    Execution(#[from] ActionError),
}

impl AttemptError {
    /// A not-ready dependency leaves the job gated rather than failed
    pub fn is_gating(&self) -> bool {
        matches!(self, Self::DependencyNotReady { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = AttemptError::Timeout {
            budget: Duration::from_secs(3),
        };
        assert!(err.to_string().contains("Execution time exceeded"));
    }

    #[test]
    fn test_dependency_messages_name_the_action() {
        let not_ready = AttemptError::DependencyNotReady {
            action: "fetch".to_string(),
        };
        assert!(not_ready.to_string().contains("fetch"));

        let failed = AttemptError::DependencyFailed {
            action: "fetch".to_string(),
        };
        assert!(failed.to_string().contains("fetch"));
    }

    #[test]
    fn test_is_gating() {
        assert!(
            AttemptError::DependencyNotReady {
                action: "x".to_string()
            }
            .is_gating()
        );
        assert!(
            !AttemptError::DependencyFailed {
                action: "x".to_string()
            }
            .is_gating()
        );
        assert!(
            !AttemptError::Timeout {
                budget: Duration::from_secs(1)
            }
            .is_gating()
        );
    }
}
