//! Messaging domain: conversations between users, messages, read receipts

pub mod api;
pub mod domain;
pub mod repository;

pub use domain::entities::*;
pub use domain::state::{
    ConversationEvent, ConversationState, ConversationStateMachine, StateError,
};

pub use repository::{
    ConversationRepository, ConversationSummary, MessageRepository, MessagingRepositories,
    ParticipantRepository,
};

pub use api::routes;
pub use api::MessagingState;
