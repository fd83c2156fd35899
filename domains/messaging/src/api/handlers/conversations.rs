//! Conversation handlers
//!
//! - GET   /api/conversations
//! - POST  /api/conversations
//! - GET   /api/conversations/{id}
//! - PATCH /api/conversations/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use kelmah_auth::AuthUser;
use kelmah_common::{Error, Pagination, Result, ValidatedJson};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::CONVERSATION_NOT_FOUND;
use crate::api::middleware::MessagingState;
use crate::domain::entities::{Conversation, ConversationStatus, Participant};
use crate::repository::ConversationSummary;

fn validate_status(status: &str) -> std::result::Result<(), ValidationError> {
    status
        .parse::<ConversationStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_status"))
}

/// Request for starting a conversation
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateConversationRequest {
    #[validate(required(message = "\"participant_id\" is required"))]
    pub participant_id: Option<Uuid>,

    /// Job the conversation is about
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateConversationRequest {
    #[validate(custom(
        function = "validate_status",
        message = "\"status\" must be one of [active, archived]"
    ))]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListConversationsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Preview of the newest message
#[derive(Debug, Serialize)]
pub struct LastMessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Conversation response DTO
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participants: [Uuid; 2],
    pub job_id: Option<Uuid>,
    pub status: ConversationStatus,
    pub other_participant: Participant,
    pub last_message: Option<LastMessageResponse>,
    pub unread_count: i64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConversationSummary> for ConversationResponse {
    fn from(s: ConversationSummary) -> Self {
        let last_message = match (
            s.last_message_id,
            s.last_message_sender_id,
            s.last_message_content,
            s.last_message_created_at,
        ) {
            (Some(id), Some(sender_id), Some(content), Some(created_at)) => {
                Some(LastMessageResponse {
                    id,
                    sender_id,
                    content,
                    created_at,
                })
            }
            _ => None,
        };

        let c = s.conversation;
        Self {
            id: c.id,
            participants: [c.participant_one, c.participant_two],
            job_id: c.job_id,
            status: c.status,
            other_participant: Participant {
                id: s.other_id,
                first_name: s.other_first_name,
                last_name: s.other_last_name,
                role: s.other_role,
            },
            last_message,
            unread_count: s.unread_count,
            last_message_at: c.last_message_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// Load a conversation the caller takes part in
pub(crate) async fn find_for_participant(
    state: &MessagingState,
    id: Uuid,
    user_id: Uuid,
) -> Result<Conversation> {
    state
        .repos
        .conversations
        .find(id)
        .await?
        .filter(|c| c.is_participant(user_id))
        .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))
}

async fn load_response(state: &MessagingState, id: Uuid, viewer: Uuid) -> Result<ConversationResponse> {
    state
        .repos
        .conversations
        .find_summary(id, viewer)
        .await?
        .map(ConversationResponse::from)
        .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))
}

/// The caller's inbox
pub async fn list_conversations(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    Query(query): Query<ListConversationsQuery>,
) -> Result<Json<ConversationListResponse>> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => ConversationStatus::default(),
        Some(raw) => raw
            .parse::<ConversationStatus>()
            .map_err(|_| Error::Validation("\"status\" must be one of [active, archived]".to_string()))?,
    };
    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
    };

    let (rows, total) = state
        .repos
        .conversations
        .list_for_user(ctx.user_id(), status, pagination.limit(), pagination.offset())
        .await?;

    Ok(Json(ConversationListResponse {
        conversations: rows.into_iter().map(ConversationResponse::from).collect(),
        total,
        page: pagination.page(),
        limit: pagination.limit(),
        total_pages: pagination.total_pages(total),
    }))
}

/// Start a conversation, or return the existing one for the same pair and job
pub async fn create_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    ValidatedJson(req): ValidatedJson<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>)> {
    let participant_id = req
        .participant_id
        .ok_or_else(|| Error::Validation("\"participant_id\" is required".to_string()))?;
    let conversation = Conversation::new(ctx.user_id(), participant_id, req.job_id)?;

    state
        .repos
        .participants
        .find_active(participant_id)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

    if let Some(job_id) = req.job_id {
        if !state.repos.participants.job_exists(job_id).await? {
            return Err(Error::NotFound("Job not found".to_string()));
        }
    }

    let (stored, created) = state.repos.conversations.create_or_get(&conversation).await?;

    if created {
        tracing::info!(
            conversation_id = %stored.id,
            user_id = %ctx.user_id(),
            participant_id = %participant_id,
            job_id = ?stored.job_id,
            "Conversation started"
        );
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let response = load_response(&state, stored.id, ctx.user_id()).await?;
    Ok((status, Json(response)))
}

/// Get a single conversation by ID
pub async fn get_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationResponse>> {
    Ok(Json(load_response(&state, id, ctx.user_id()).await?))
}

/// Archive or unarchive
pub async fn update_conversation(
    AuthUser(ctx): AuthUser,
    State(state): State<MessagingState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateConversationRequest>,
) -> Result<Json<ConversationResponse>> {
    let target = req
        .status
        .parse::<ConversationStatus>()
        .map_err(Error::Validation)?;

    let mut conv = find_for_participant(&state, id, ctx.user_id()).await?;
    let from = conv.status;
    conv.change_status(target)?;

    state
        .repos
        .conversations
        .update_status(id, conv.status)
        .await?
        .ok_or_else(|| Error::NotFound(CONVERSATION_NOT_FOUND.to_string()))?;

    tracing::info!(
        conversation_id = %id,
        user_id = %ctx.user_id(),
        from = %from,
        to = %conv.status,
        "Conversation status changed"
    );

    Ok(Json(load_response(&state, id, ctx.user_id()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kelmah_auth::UserRole;
    use kelmah_common::validation_messages;

    fn summary(last_message: bool) -> ConversationSummary {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let conversation = Conversation::new(me, other, None).unwrap();
        ConversationSummary {
            last_message_id: last_message.then(Uuid::new_v4),
            last_message_sender_id: last_message.then_some(other),
            last_message_content: last_message.then(|| "See you at 9".to_string()),
            last_message_created_at: last_message.then(Utc::now),
            conversation,
            other_id: other,
            other_first_name: "Abena".to_string(),
            other_last_name: "Owusu".to_string(),
            other_role: UserRole::Worker,
            unread_count: 2,
        }
    }

    #[test]
    fn test_response_nests_last_message() {
        let response = ConversationResponse::from(summary(true));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["other_participant"]["first_name"], "Abena");
        assert_eq!(json["other_participant"]["role"], "worker");
        assert_eq!(json["last_message"]["content"], "See you at 9");
        assert_eq!(json["unread_count"], 2);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_response_without_messages() {
        let response = ConversationResponse::from(summary(false));
        assert!(response.last_message.is_none());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["last_message"].is_null());
    }

    #[test]
    fn test_create_request_requires_participant() {
        let req = CreateConversationRequest::default();
        let errors = req.validate().unwrap_err();
        assert_eq!(
            validation_messages(&errors),
            "\"participant_id\" is required"
        );
    }

    #[test]
    fn test_update_request_status_values() {
        let req = UpdateConversationRequest {
            status: "archived".to_string(),
        };
        assert!(req.validate().is_ok());

        let req = UpdateConversationRequest {
            status: "deleted".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(
            validation_messages(&errors),
            "\"status\" must be one of [active, archived]"
        );
    }
}
