//! State machine for conversation status transitions
//!
//! Conversation states: Active ↔ Archived (bidirectional)

pub use kelmah_common::StateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationState {
    Active,
    Archived,
}

impl ConversationState {
    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [ConversationState] {
        match self {
            Self::Active => &[Self::Archived],
            Self::Archived => &[Self::Active],
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// Events that trigger conversation state transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversationEvent {
    Archive,
    /// Move back to the inbox
    Unarchive,
}

impl ConversationEvent {
    /// Event that leads to `target`
    pub fn for_target(target: ConversationState) -> Self {
        match target {
            ConversationState::Active => Self::Unarchive,
            ConversationState::Archived => Self::Archive,
        }
    }
}

impl std::fmt::Display for ConversationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Unarchive => write!(f, "unarchive"),
        }
    }
}

/// Conversation state machine
pub struct ConversationStateMachine;

impl ConversationStateMachine {
    /// Attempt a state transition
    pub fn transition(
        current: ConversationState,
        event: ConversationEvent,
    ) -> Result<ConversationState, StateError> {
        match (current, event) {
            (ConversationState::Active, ConversationEvent::Archive) => {
                Ok(ConversationState::Archived)
            }
            (ConversationState::Archived, ConversationEvent::Unarchive) => {
                Ok(ConversationState::Active)
            }
            _ => Err(StateError::InvalidTransition {
                from: current.to_string(),
                to: current.to_string(),
                event: event.to_string(),
            }),
        }
    }
}
