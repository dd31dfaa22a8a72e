use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Notification;

pub struct NewNotification<'a> {
    pub todo_id: Uuid,
    pub user_id: Uuid,
    pub requested_by: Uuid,
    pub fire_at: DateTime<Utc>,
    pub calendar_trigger: &'a str,
    pub max_attempts: i32,
}

pub async fn create(
    pool: &PgPool,
    new: &NewNotification<'_>,
) -> Result<Notification, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        "INSERT INTO notifications
             (id, todo_id, user_id, requested_by, fire_at, calendar_trigger, max_attempts, next_attempt_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(new.todo_id)
    .bind(new.user_id)
    .bind(new.requested_by)
    .bind(new.fire_at)
    .bind(new.calendar_trigger)
    .bind(new.max_attempts)
    .fetch_one(pool)
    .await
}

/// Atomically claim the next due notification using SELECT FOR UPDATE SKIP LOCKED.
pub async fn claim_next(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET status = 'processing', attempts = attempts + 1
         WHERE id = (
             SELECT id FROM notifications
             WHERE status IN ('pending', 'failed')
               AND next_attempt_at <= $1
             ORDER BY next_attempt_at ASC
             LIMIT 1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Final states: `sent`, `skipped` or `cancelled`. None of them is claimable again.
pub async fn mark_finished(
    pool: &PgPool,
    id: Uuid,
    status: &str,
    note: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE notifications SET status = $2, last_error = $3, finished_at = now()
         WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .bind(note)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mark as failed with exponential backoff. Once max attempts is reached the
/// row becomes `dead` and is never claimed again.
pub async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    attempts: i32,
    max_attempts: i32,
    error: &str,
) -> Result<(), sqlx::Error> {
    if attempts >= max_attempts {
        sqlx::query("UPDATE notifications SET status = 'dead', last_error = $2 WHERE id = $1")
            .bind(id)
            .bind(error)
            .execute(pool)
            .await?;
    } else {
        let delay = backoff_secs(attempts);
        sqlx::query(
            "UPDATE notifications
             SET status = 'failed',
                 last_error = $2,
                 next_attempt_at = now() + make_interval(secs => $3::double precision)
             WHERE id = $1",
        )
        .bind(id)
        .bind(error)
        .bind(delay as f64)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// 2^attempts minutes, capped at one day.
pub fn backoff_secs(attempts: i32) -> i64 {
    const MAX_BACKOFF_SECS: i64 = 24 * 60 * 60;

    2_i64
        .checked_pow(attempts.max(0) as u32)
        .and_then(|factor| factor.checked_mul(60))
        .map_or(MAX_BACKOFF_SECS, |secs| secs.min(MAX_BACKOFF_SECS))
}

/// Put rows stranded in `processing` by a crash back into the due set.
pub async fn requeue_stalled(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET status = 'pending' WHERE status = 'processing'")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
