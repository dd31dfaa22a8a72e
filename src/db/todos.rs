use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{Todo, TodoStatus};

/// The three mutually exclusive views of a user's todos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    /// Not deleted and not yet past expiration.
    Active,
    Deleted,
    /// Not deleted and marked expired.
    Expired,
}

pub struct ListParams {
    pub owner: Uuid,
    pub filter: ListFilter,
    pub now: DateTime<Utc>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn create(
    pool: &PgPool,
    name: &str,
    expiration_time: DateTime<Utc>,
    added_by: Uuid,
) -> Result<Todo, sqlx::Error> {
    sqlx::query_as::<_, Todo>(
        "INSERT INTO todos (id, name, expiration_time, added_by)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(name)
    .bind(expiration_time)
    .bind(added_by)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_owned(pool: &PgPool, id: Uuid, owner: Uuid) -> Result<Option<Todo>, sqlx::Error> {
    sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = $1 AND added_by = $2")
        .bind(id)
        .bind(owner)
        .fetch_optional(pool)
        .await
}

/// Whether a non-deleted todo other than `exclude` already uses `name`.
pub async fn name_taken(
    pool: &PgPool,
    name: &str,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(
             SELECT 1 FROM todos
             WHERE name = $1 AND is_deleted = false AND ($2::uuid IS NULL OR id <> $2)
         )",
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Partial update. An expired todo whose expiration moves past `now` goes back
/// to pending.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    owner: Uuid,
    name: Option<&str>,
    expiration_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Todo, sqlx::Error> {
    sqlx::query_as::<_, Todo>(
        "UPDATE todos
         SET name = COALESCE($3, name),
             expiration_time = COALESCE($4, expiration_time),
             status = CASE
                 WHEN status = 'expired' AND COALESCE($4, expiration_time) > $5 THEN 'pending'
                 ELSE status
             END,
             updated_at = $5
         WHERE id = $1 AND added_by = $2 RETURNING *",
    )
    .bind(id)
    .bind(owner)
    .bind(name)
    .bind(expiration_time)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn set_status(
    pool: &PgPool,
    ids: &[Uuid],
    owner: Uuid,
    status: TodoStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE todos SET status = $3, updated_at = now()
         WHERE id = ANY($1) AND added_by = $2",
    )
    .bind(ids)
    .bind(owner)
    .bind(status)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn soft_delete(
    pool: &PgPool,
    ids: &[Uuid],
    owner: Uuid,
    deleted_by: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE todos SET is_deleted = true, deleted_by = $3, updated_at = now()
         WHERE id = ANY($1) AND added_by = $2",
    )
    .bind(ids)
    .bind(owner)
    .bind(deleted_by)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Undelete in one statement: still-live expirations come back pending, the
/// rest come back expired. A todo whose name is now used by a live todo stays
/// deleted. Returns the ids that were restored.
pub async fn restore(
    pool: &PgPool,
    ids: &[Uuid],
    owner: Uuid,
    restored_by: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE todos
         SET is_deleted = false,
             status = CASE WHEN expiration_time > $4 THEN 'pending' ELSE 'expired' END,
             restored_by = $3,
             updated_at = $4
         WHERE id = ANY($1) AND added_by = $2 AND is_deleted = true
           AND NOT EXISTS (
               SELECT 1 FROM todos live
               WHERE live.name = todos.name AND live.is_deleted = false
           )
         RETURNING id",
    )
    .bind(ids)
    .bind(owner)
    .bind(restored_by)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Force every todo whose expiration is at or before `now` to expired,
/// whatever its status, across all owners.
pub async fn sweep_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE todos SET status = 'expired', updated_at = $1
         WHERE status <> 'expired' AND expiration_time <= $1",
    )
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, params: &ListParams) {
    qb.push(" WHERE added_by = ").push_bind(params.owner);
    match params.filter {
        ListFilter::Active => {
            qb.push(" AND is_deleted = false AND expiration_time >= ")
                .push_bind(params.now);
        }
        ListFilter::Deleted => {
            qb.push(" AND is_deleted = true");
        }
        ListFilter::Expired => {
            qb.push(" AND is_deleted = false AND status = 'expired'");
        }
    }
}

pub async fn list(pool: &PgPool, params: &ListParams) -> Result<Vec<Todo>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM todos");
    push_filter(&mut qb, params);
    qb.push(" ORDER BY id DESC LIMIT ")
        .push_bind(params.limit)
        .push(" OFFSET ")
        .push_bind(params.offset);

    qb.build_query_as::<Todo>().fetch_all(pool).await
}

pub async fn count(pool: &PgPool, params: &ListParams) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM todos");
    push_filter(&mut qb, params);

    let row: (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(row.0)
}
