use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PasswordResetToken;

pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordResetToken, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(pool)
    .await
}

/// Atomically consume a token: only an unused, unexpired token is returned,
/// and it is marked used in the same statement.
pub async fn consume<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "UPDATE password_reset_tokens SET used = true
         WHERE token_hash = $1 AND used = false AND expires_at > $2
         RETURNING *",
    )
    .bind(token_hash)
    .bind(now)
    .fetch_optional(executor)
    .await
}
