//! Conversation repository

use chrono::{DateTime, Utc};
use kelmah_auth::UserRole;
use kelmah_common::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{ordered_pair, Conversation, ConversationStatus};

pub(crate) const CONVERSATION_COLUMNS: &str = "id, participant_one, participant_two, job_id, \
     status, last_message_at, created_at, updated_at";

/// Inbox row: the conversation plus what the viewer needs to render it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationSummary {
    #[sqlx(flatten)]
    pub conversation: Conversation,
    pub other_id: Uuid,
    pub other_first_name: String,
    pub other_last_name: String,
    pub other_role: UserRole,
    pub last_message_id: Option<Uuid>,
    pub last_message_sender_id: Option<Uuid>,
    pub last_message_content: Option<String>,
    pub last_message_created_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

/// `$1` is always the viewer
const SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.participant_one, c.participant_two, c.job_id, c.status,
           c.last_message_at, c.created_at, c.updated_at,
           u.id AS other_id, u.first_name AS other_first_name,
           u.last_name AS other_last_name, u.role AS other_role,
           lm.id AS last_message_id, lm.sender_id AS last_message_sender_id,
           lm.content AS last_message_content, lm.created_at AS last_message_created_at,
           (SELECT COUNT(*) FROM messages m
             WHERE m.conversation_id = c.id
               AND m.sender_id <> $1
               AND m.read_at IS NULL) AS unread_count
    FROM conversations c
    JOIN users u ON u.id = CASE WHEN c.participant_one = $1
                                THEN c.participant_two ELSE c.participant_one END
    LEFT JOIN LATERAL (
        SELECT id, sender_id, content, created_at FROM messages
        WHERE conversation_id = c.id
        ORDER BY created_at DESC, id DESC
        LIMIT 1
    ) lm ON TRUE
"#;

#[derive(Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find conversation by ID
    pub async fn find(&self, id: Uuid) -> Result<Option<Conversation>> {
        let conv = sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conv)
    }

    /// Conversation between two users about `job_id` (or about nothing)
    pub async fn find_between(
        &self,
        a: Uuid,
        b: Uuid,
        job_id: Option<Uuid>,
    ) -> Result<Option<Conversation>> {
        let (one, two) = ordered_pair(a, b);
        let conv = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            SELECT {CONVERSATION_COLUMNS} FROM conversations
            WHERE participant_one = $1 AND participant_two = $2
              AND job_id IS NOT DISTINCT FROM $3
            "#
        ))
        .bind(one)
        .bind(two)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conv)
    }

    /// Insert unless the pair already talks about this job.
    /// Returns the stored conversation and whether it was created now.
    pub async fn create_or_get(&self, conv: &Conversation) -> Result<(Conversation, bool)> {
        let created = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            INSERT INTO conversations ({CONVERSATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(conv.id)
        .bind(conv.participant_one)
        .bind(conv.participant_two)
        .bind(conv.job_id)
        .bind(conv.status)
        .bind(conv.last_message_at)
        .bind(conv.created_at)
        .bind(conv.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(created) = created {
            return Ok((created, true));
        }

        let existing = self
            .find_between(conv.participant_one, conv.participant_two, conv.job_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok((existing, false))
    }

    /// The viewer's conversations, most recent activity first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        status: ConversationStatus,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ConversationSummary>, i64)> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM conversations
            WHERE (participant_one = $1 OR participant_two = $1) AND status = $2
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ConversationSummary>(&format!(
            r#"{SUMMARY_SELECT}
            WHERE (c.participant_one = $1 OR c.participant_two = $1) AND c.status = $2
            ORDER BY COALESCE(c.last_message_at, c.created_at) DESC, c.id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// One conversation as seen by `viewer`; `None` unless they take part
    pub async fn find_summary(
        &self,
        id: Uuid,
        viewer: Uuid,
    ) -> Result<Option<ConversationSummary>> {
        let row = sqlx::query_as::<_, ConversationSummary>(&format!(
            r#"{SUMMARY_SELECT}
            WHERE c.id = $2 AND (c.participant_one = $1 OR c.participant_two = $1)
            "#
        ))
        .bind(viewer)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Persist a status change
    pub async fn update_status(
        &self,
        id: Uuid,
        status: ConversationStatus,
    ) -> Result<Option<Conversation>> {
        let updated = sqlx::query_as::<_, Conversation>(&format!(
            r#"
            UPDATE conversations SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CONVERSATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }
}
