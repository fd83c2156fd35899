//! Common state machine error types
//!
//! Shared across all domain crates that implement state machines.

use crate::error::Error;
use thiserror::Error;

/// Errors that can occur during state transitions
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Invalid transition: cannot transition from {from} to {to} via {event}")]
    InvalidTransition {
        from: String,
        to: String,
        event: String,
    },

    #[error("Guard condition failed: {0}")]
    GuardFailed(String),

    #[error("Terminal state: {0} is a terminal state and cannot transition")]
    TerminalState(String),
}

impl StateError {
    /// Convert into a client-facing validation error for `entity`.
    pub fn into_error(self, entity: &str) -> Error {
        match self {
            StateError::InvalidTransition { from, to, .. } => Error::Validation(format!(
                "Cannot move {} from {} to {}",
                entity, from, to
            )),
            StateError::TerminalState(state) => Error::Validation(format!(
                "{} is {} and can no longer change status",
                capitalize(entity),
                state
            )),
            StateError::GuardFailed(reason) => Error::Validation(reason),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message() {
        let err = StateError::InvalidTransition {
            from: "draft".into(),
            to: "completed".into(),
            event: "complete".into(),
        }
        .into_error("job");
        assert_eq!(err.to_string(), "Cannot move job from draft to completed");
    }

    #[test]
    fn test_terminal_state_message() {
        let err = StateError::TerminalState("cancelled".into()).into_error("job");
        assert_eq!(
            err.to_string(),
            "Job is cancelled and can no longer change status"
        );
    }

    #[test]
    fn test_guard_failure_keeps_reason() {
        let err = StateError::GuardFailed("No worker assigned".into()).into_error("job");
        assert!(matches!(err, Error::Validation(ref m) if m == "No worker assigned"));
    }
}
