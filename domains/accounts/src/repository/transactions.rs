//! Transactional free functions for the Accounts domain

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::users::USER_COLUMNS;
use crate::domain::entities::User;

/// Consume a reset token and set the new password hash. Clears lockout and
/// invalidates issued access tokens. `None` when the token is unknown or
/// expired.
pub async fn reset_password_tx(
    transaction: &mut Transaction<'_, Postgres>,
    token_hash: &str,
    password_hash: &str,
) -> std::result::Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            password_hash = $2,
            password_reset_token_hash = NULL,
            password_reset_expires_at = NULL,
            failed_login_attempts = 0,
            locked_until = NULL,
            token_version = token_version + 1,
            updated_at = NOW()
        WHERE password_reset_token_hash = $1
          AND password_reset_expires_at > NOW()
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(token_hash)
    .bind(password_hash)
    .fetch_optional(&mut **transaction)
    .await
}

/// Set a new password hash and bump the token version.
pub async fn update_password_tx(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    password_hash: &str,
) -> std::result::Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            password_hash = $2,
            token_version = token_version + 1,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(password_hash)
    .fetch_one(&mut **transaction)
    .await
}

/// Mark the account inactive and invalidate its access tokens.
pub async fn deactivate_user_tx(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users SET
            is_active = FALSE,
            deactivated_at = NOW(),
            token_version = token_version + 1,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(&mut **transaction)
    .await?;
    Ok(())
}

/// Revoke every active session of a user.
pub async fn revoke_user_sessions_tx(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> std::result::Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sessions SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(&mut **transaction)
    .await?;
    Ok(result.rows_affected())
}

/// Revoke every session of a user except `keep`.
pub async fn revoke_other_sessions_tx(
    transaction: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    keep: Uuid,
) -> std::result::Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE sessions SET revoked_at = NOW()
        WHERE user_id = $1 AND id <> $2 AND revoked_at IS NULL
        "#,
    )
    .bind(user_id)
    .bind(keep)
    .execute(&mut **transaction)
    .await?;
    Ok(result.rows_affected())
}
