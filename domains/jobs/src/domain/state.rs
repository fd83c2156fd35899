//! State machines for Jobs domain entities
//!
//! Each state machine defines:
//! - Valid states
//! - Events that trigger transitions
//! - Guard conditions for transitions
//! - Terminal states

use serde::{Deserialize, Serialize};

pub use kelmah_common::StateError;

// ============================================================================
// Job State Machine
// ============================================================================

/// Job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Draft,
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl JobState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [JobState] {
        match self {
            Self::Draft => &[Self::Open, Self::Cancelled],
            Self::Open => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Open, Self::Cancelled],
            Self::Completed => &[],
            Self::Cancelled => &[],
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Open => write!(f, "open"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events that trigger job state transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobEvent {
    /// Hirer makes a draft visible to workers
    Publish,
    /// An application is accepted
    Hire,
    /// Hirer marks the work as done
    Complete,
    /// Hirer withdraws the job
    Cancel,
    /// Hired worker is released and the job is listed again
    Reopen,
}

impl JobEvent {
    pub const ALL: [JobEvent; 5] = [
        JobEvent::Publish,
        JobEvent::Hire,
        JobEvent::Complete,
        JobEvent::Cancel,
        JobEvent::Reopen,
    ];
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Publish => write!(f, "publish"),
            Self::Hire => write!(f, "hire"),
            Self::Complete => write!(f, "complete"),
            Self::Cancel => write!(f, "cancel"),
            Self::Reopen => write!(f, "reopen"),
        }
    }
}

/// Guard context for job transitions
#[derive(Debug, Clone)]
pub struct JobGuardContext {
    /// Whether a worker is being assigned with this transition
    pub has_worker: bool,
}

/// Job state machine
pub struct JobStateMachine;

impl JobStateMachine {
    /// Attempt a state transition
    ///
    /// Returns the new state if the transition is valid, or an error otherwise.
    pub fn transition(
        current: JobState,
        event: JobEvent,
        context: Option<&JobGuardContext>,
    ) -> Result<JobState, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (&current, &event) {
            (JobState::Draft, JobEvent::Publish) => JobState::Open,

            (JobState::Open, JobEvent::Hire) => {
                // Guard: hiring needs a worker
                if !context.is_some_and(|ctx| ctx.has_worker) {
                    return Err(StateError::GuardFailed(
                        "A worker can only be hired by accepting an application".to_string(),
                    ));
                }
                JobState::InProgress
            }

            (JobState::InProgress, JobEvent::Complete) => JobState::Completed,
            (JobState::InProgress, JobEvent::Reopen) => JobState::Open,

            (JobState::Draft | JobState::Open | JobState::InProgress, JobEvent::Cancel) => {
                JobState::Cancelled
            }

            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    to: "unknown".to_string(),
                    event: event.to_string(),
                });
            }
        };

        Ok(next)
    }

    /// Resolve a requested target status into the event that reaches it
    pub fn event_for_target(current: JobState, target: JobState) -> Result<JobEvent, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let permissive = JobGuardContext { has_worker: true };
        JobEvent::ALL
            .into_iter()
            .find(|event| Self::transition(current, *event, Some(&permissive)) == Ok(target))
            .ok_or_else(|| StateError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
                event: "set_status".to_string(),
            })
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(
        current: JobState,
        event: JobEvent,
        context: Option<&JobGuardContext>,
    ) -> bool {
        Self::transition(current, event, context).is_ok()
    }
}

// ============================================================================
// Application State Machine
// ============================================================================

/// Job application states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationState {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn valid_transitions(&self) -> &'static [ApplicationState] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Rejected, Self::Withdrawn],
            Self::Accepted | Self::Rejected | Self::Withdrawn => &[],
        }
    }
}

impl std::fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected => write!(f, "rejected"),
            Self::Withdrawn => write!(f, "withdrawn"),
        }
    }
}

/// Events that trigger application state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationEvent {
    /// Hirer accepts the applicant
    Accept,
    /// Hirer turns the applicant down
    Reject,
    /// Applicant pulls out
    Withdraw,
}

impl std::fmt::Display for ApplicationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Reject => write!(f, "reject"),
            Self::Withdraw => write!(f, "withdraw"),
        }
    }
}

/// Application state machine
pub struct ApplicationStateMachine;

impl ApplicationStateMachine {
    pub fn transition(
        current: ApplicationState,
        event: ApplicationEvent,
    ) -> Result<ApplicationState, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        Ok(match event {
            ApplicationEvent::Accept => ApplicationState::Accepted,
            ApplicationEvent::Reject => ApplicationState::Rejected,
            ApplicationEvent::Withdraw => ApplicationState::Withdrawn,
        })
    }

    pub fn can_transition(current: ApplicationState, event: ApplicationEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Job State Machine Tests
    // ------------------------------------------------------------------------

    mod job_state_machine {
        use super::*;

        const WITH_WORKER: JobGuardContext = JobGuardContext { has_worker: true };

        #[test]
        fn test_valid_draft_to_open() {
            let result = JobStateMachine::transition(JobState::Draft, JobEvent::Publish, None);
            assert_eq!(result, Ok(JobState::Open));
        }

        #[test]
        fn test_valid_open_to_in_progress_with_worker() {
            let result =
                JobStateMachine::transition(JobState::Open, JobEvent::Hire, Some(&WITH_WORKER));
            assert_eq!(result, Ok(JobState::InProgress));
        }

        #[test]
        fn test_hire_without_worker_fails_guard() {
            let result = JobStateMachine::transition(JobState::Open, JobEvent::Hire, None);
            assert!(matches!(result, Err(StateError::GuardFailed(_))));

            let ctx = JobGuardContext { has_worker: false };
            let result = JobStateMachine::transition(JobState::Open, JobEvent::Hire, Some(&ctx));
            assert!(matches!(result, Err(StateError::GuardFailed(_))));
        }

        #[test]
        fn test_valid_in_progress_to_completed_and_reopen() {
            assert_eq!(
                JobStateMachine::transition(JobState::InProgress, JobEvent::Complete, None),
                Ok(JobState::Completed)
            );
            assert_eq!(
                JobStateMachine::transition(JobState::InProgress, JobEvent::Reopen, None),
                Ok(JobState::Open)
            );
        }

        #[test]
        fn test_cancel_from_every_live_state() {
            for state in [JobState::Draft, JobState::Open, JobState::InProgress] {
                assert_eq!(
                    JobStateMachine::transition(state, JobEvent::Cancel, None),
                    Ok(JobState::Cancelled)
                );
            }
        }

        #[test]
        fn test_invalid_draft_to_completed() {
            let result = JobStateMachine::transition(JobState::Draft, JobEvent::Complete, None);
            assert!(matches!(result, Err(StateError::InvalidTransition { .. })));
        }

        #[test]
        fn test_invalid_open_to_publish_again() {
            let result = JobStateMachine::transition(JobState::Open, JobEvent::Publish, None);
            assert!(matches!(result, Err(StateError::InvalidTransition { .. })));
        }

        #[test]
        fn test_terminal_states_cannot_transition() {
            for state in [JobState::Completed, JobState::Cancelled] {
                for event in JobEvent::ALL {
                    let result = JobStateMachine::transition(state, event, Some(&WITH_WORKER));
                    assert!(matches!(result, Err(StateError::TerminalState(_))));
                }
            }
        }

        #[test]
        fn test_valid_transitions_agree_with_transition() {
            for state in [
                JobState::Draft,
                JobState::Open,
                JobState::InProgress,
                JobState::Completed,
                JobState::Cancelled,
            ] {
                let mut reachable: Vec<JobState> = JobEvent::ALL
                    .into_iter()
                    .filter_map(|e| JobStateMachine::transition(state, e, Some(&WITH_WORKER)).ok())
                    .collect();
                let mut expected = state.valid_transitions().to_vec();
                reachable.sort_by_key(|s| s.to_string());
                expected.sort_by_key(|s| s.to_string());
                assert_eq!(reachable, expected, "from {}", state);
            }
        }

        #[test]
        fn test_event_for_target() {
            assert_eq!(
                JobStateMachine::event_for_target(JobState::Draft, JobState::Open),
                Ok(JobEvent::Publish)
            );
            assert_eq!(
                JobStateMachine::event_for_target(JobState::InProgress, JobState::Open),
                Ok(JobEvent::Reopen)
            );
            assert_eq!(
                JobStateMachine::event_for_target(JobState::Open, JobState::InProgress),
                Ok(JobEvent::Hire)
            );
            assert!(matches!(
                JobStateMachine::event_for_target(JobState::Draft, JobState::Completed),
                Err(StateError::InvalidTransition { .. })
            ));
            assert!(matches!(
                JobStateMachine::event_for_target(JobState::Completed, JobState::Open),
                Err(StateError::TerminalState(_))
            ));
        }

        #[test]
        fn test_display_matches_database_labels() {
            assert_eq!(JobState::InProgress.to_string(), "in_progress");
            assert_eq!(JobState::Cancelled.to_string(), "cancelled");
        }
    }

    // ------------------------------------------------------------------------
    // Application State Machine Tests
    // ------------------------------------------------------------------------

    mod application_state_machine {
        use super::*;

        #[test]
        fn test_pending_reaches_every_outcome() {
            assert_eq!(
                ApplicationStateMachine::transition(
                    ApplicationState::Pending,
                    ApplicationEvent::Accept
                ),
                Ok(ApplicationState::Accepted)
            );
            assert_eq!(
                ApplicationStateMachine::transition(
                    ApplicationState::Pending,
                    ApplicationEvent::Reject
                ),
                Ok(ApplicationState::Rejected)
            );
            assert_eq!(
                ApplicationStateMachine::transition(
                    ApplicationState::Pending,
                    ApplicationEvent::Withdraw
                ),
                Ok(ApplicationState::Withdrawn)
            );
        }

        #[test]
        fn test_outcomes_are_terminal() {
            for state in [
                ApplicationState::Accepted,
                ApplicationState::Rejected,
                ApplicationState::Withdrawn,
            ] {
                assert!(state.is_terminal());
                assert!(state.valid_transitions().is_empty());
                assert!(!ApplicationStateMachine::can_transition(
                    state,
                    ApplicationEvent::Withdraw
                ));
            }
        }
    }
}
