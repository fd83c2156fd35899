//! Message repository

use kelmah_common::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::Message;

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, content, read_at, created_at";

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One page of a conversation, oldest first
    pub async fn list_by_conversation(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Message>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;

        let messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((messages, total))
    }

    /// Mark everything the other participant sent as read.
    /// Returns how many messages changed.
    pub async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read_at = NOW()
            WHERE conversation_id = $1 AND sender_id <> $2 AND read_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
