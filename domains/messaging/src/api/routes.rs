//! Route definitions for Messaging domain API

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{conversations, messages};
use super::middleware::MessagingState;

/// Create all Messaging domain routes
pub fn routes() -> Router<MessagingState> {
    Router::new()
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(conversations::get_conversation).patch(conversations::update_conversation),
        )
        .route(
            "/api/conversations/{id}/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/api/conversations/{id}/read", post(messages::mark_read))
}
