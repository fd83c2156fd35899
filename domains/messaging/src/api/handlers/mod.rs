//! HTTP handlers for the Messaging domain

pub mod conversations;
pub mod messages;

pub(crate) const CONVERSATION_NOT_FOUND: &str = "Conversation not found";
