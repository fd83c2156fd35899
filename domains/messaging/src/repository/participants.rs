//! Read models over tables owned by other domains

use kelmah_common::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::Participant;

#[derive(Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active user that can be messaged
    pub async fn find_active(&self, id: Uuid) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            "SELECT id, first_name, last_name, role FROM users WHERE id = $1 AND is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    pub async fn job_exists(&self, job_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1)")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
