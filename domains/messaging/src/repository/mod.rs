//! Repository implementations for Messaging domain

pub mod conversations;
pub mod messages;
pub mod participants;
pub mod transactions;

use sqlx::{PgPool, Postgres, Transaction};

pub use conversations::{ConversationRepository, ConversationSummary};
pub use messages::MessageRepository;
pub use participants::ParticipantRepository;
pub use transactions::{insert_message_tx, lock_conversation_tx};

/// Combined repository access for the Messaging domain
#[derive(Clone)]
pub struct MessagingRepositories {
    pool: PgPool,
    pub conversations: ConversationRepository,
    pub messages: MessageRepository,
    pub participants: ParticipantRepository,
}

impl MessagingRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            conversations: ConversationRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            participants: ParticipantRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn begin(&self) -> std::result::Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}
