//! Message handlers
//!
//! - GET  /api/conversations/{id}/messages
//! - POST /api/conversations/{id}/messages
//! - POST /api/conversations/{id}/read

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use kelmah_auth::AuthUser;
use kelmah_common::{Error, Pagination, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::conversations::find_for_participant;
use super::CONVERSATION_NOT_FOUND;
use crate::api::middleware::MessagingState;
use crate::domain::entities::Message;
use crate::repository::{insert_message_tx, lock_conversation_tx};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SendMessageRequest {
    #[validate(length(
        min = 1,
        max = 5000,
        message = "\"content\" must be between 1 and 5000 characters"
    ))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// Messages of a conversation, oldest first
pub async fn list_messages(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<MessageListResponse>> {
    let conv = find_for_participant(&state, id, ctx.user_id()).await?;

    let (messages, total) = state
        .repos
        .messages
        .list_by_conversation(conv.id, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(MessageListResponse {
        messages,
        total,
        page: pagination.page(),
        limit: pagination.limit(),
        total_pages: pagination.total_pages(total),
    }))
}

/// Send a message into an active conversation
pub async fn send_message(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    let mut tx = state.repos.begin().await?;

    let conv = lock_conversation_tx(&mut tx, id)
        .await?
        .filter(|c| c.is_participant(ctx.user_id()))
        .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))?;
    conv.ensure_can_send()?;

    let message = Message::new(conv.id, ctx.user_id(), &req.content)?;
    let created = insert_message_tx(&mut tx, &message).await?;
    tx.commit().await?;

    tracing::debug!(
        conversation_id = %conv.id,
        message_id = %created.id,
        sender_id = %created.sender_id,
        "Message sent"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// Mark the other participant's messages as read
pub async fn mark_read(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>> {
    let conv = find_for_participant(&state, id, ctx.user_id()).await?;
    let updated = state.repos.messages.mark_read(conv.id, ctx.user_id()).await?;

    Ok(Json(MarkReadResponse { updated }))
}
