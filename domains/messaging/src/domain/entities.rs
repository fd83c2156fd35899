//! Domain entities for the Messaging domain
//!
//! A conversation joins exactly two users, optionally about one job.
//! Participants are stored ordered (`participant_one < participant_two`) so
//! the same pair always maps to the same row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kelmah_auth::UserRole;
use kelmah_common::{Error, Result};

use crate::domain::state::{ConversationEvent, ConversationState, ConversationStateMachine};

/// Maximum message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// Conversation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "conversation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Active,
    Archived,
}

impl ConversationStatus {
    pub fn to_state(&self) -> ConversationState {
        match self {
            ConversationStatus::Active => ConversationState::Active,
            ConversationStatus::Archived => ConversationState::Archived,
        }
    }

    pub fn from_state(state: ConversationState) -> Self {
        match state {
            ConversationState::Active => ConversationStatus::Active,
            ConversationState::Archived => ConversationStatus::Archived,
        }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_state())
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(ConversationStatus::Active),
            "archived" => Ok(ConversationStatus::Archived),
            other => Err(format!("Unknown conversation status: {}", other)),
        }
    }
}

/// Conversation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_one: Uuid,
    pub participant_two: Uuid,
    pub job_id: Option<Uuid>,
    pub status: ConversationStatus,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new conversation between `initiator` and `participant`
    pub fn new(initiator: Uuid, participant: Uuid, job_id: Option<Uuid>) -> Result<Self> {
        if initiator == participant {
            return Err(Error::Validation(
                "You cannot start a conversation with yourself".to_string(),
            ));
        }

        let (participant_one, participant_two) = ordered_pair(initiator, participant);
        let now = Utc::now();
        Ok(Conversation {
            id: Uuid::new_v4(),
            participant_one,
            participant_two,
            job_id,
            status: ConversationStatus::default(),
            last_message_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_one == user_id || self.participant_two == user_id
    }

    /// The participant that is not `user_id`
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.participant_one == user_id {
            self.participant_two
        } else {
            self.participant_one
        }
    }

    /// Archived conversations are read-only
    pub fn ensure_can_send(&self) -> Result<()> {
        match self.status {
            ConversationStatus::Active => Ok(()),
            ConversationStatus::Archived => Err(Error::Validation(
                "Conversation is archived; unarchive it to send messages".to_string(),
            )),
        }
    }

    /// Move to `target` through the state machine
    pub fn change_status(&mut self, target: ConversationStatus) -> Result<()> {
        let event = ConversationEvent::for_target(target.to_state());
        let next = ConversationStateMachine::transition(self.status.to_state(), event)
            .map_err(|e| e.into_error("conversation"))?;
        self.status = ConversationStatus::from_state(next);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Smaller id first
pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(conversation_id: Uuid, sender_id: Uuid, content: &str) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::Validation(
                "\"content\" cannot be empty".to_string(),
            ));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(Error::Validation(format!(
                "\"content\" must be at most {} characters",
                MAX_MESSAGE_LENGTH
            )));
        }

        Ok(Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            read_at: None,
            created_at: Utc::now(),
        })
    }
}

/// Public profile of a conversation participant
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Participant {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}
