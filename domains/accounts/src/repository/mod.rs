//! Repository implementations for the Accounts domain

pub mod sessions;
pub mod transactions;
pub mod users;

use sqlx::{PgPool, Postgres, Transaction};

pub use sessions::SessionRepository;
pub use transactions::{
    deactivate_user_tx, reset_password_tx, revoke_other_sessions_tx, revoke_user_sessions_tx,
    update_password_tx,
};
pub use users::UserRepository;

/// Combined repository access for the Accounts domain
#[derive(Clone)]
pub struct AccountsRepositories {
    pool: PgPool,
    pub users: UserRepository,
    pub sessions: SessionRepository,
}

impl AccountsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            pool,
        }
    }

    /// Begin a new database transaction.
    pub async fn begin(&self) -> std::result::Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
