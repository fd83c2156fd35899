//! Transaction helpers for Messaging domain

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::conversations::CONVERSATION_COLUMNS;
use super::messages::MESSAGE_COLUMNS;
use crate::domain::entities::{Conversation, Message};

/// Load a conversation and hold its row lock so an archive cannot race a send
pub async fn lock_conversation_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Conversation>, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

/// Insert a message and bump the conversation's activity timestamp
pub async fn insert_message_tx(
    tx: &mut Transaction<'_, Postgres>,
    msg: &Message,
) -> Result<Message, sqlx::Error> {
    let created = sqlx::query_as::<_, Message>(&format!(
        r#"
        INSERT INTO messages ({MESSAGE_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {MESSAGE_COLUMNS}
        "#
    ))
    .bind(msg.id)
    .bind(msg.conversation_id)
    .bind(msg.sender_id)
    .bind(&msg.content)
    .bind(msg.read_at)
    .bind(msg.created_at)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        "UPDATE conversations SET last_message_at = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(created.conversation_id)
    .bind(created.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(created)
}
