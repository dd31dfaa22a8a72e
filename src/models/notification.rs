use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A one-shot reminder. Leaves the due set (`pending`/`failed`) once it is
/// sent, skipped, cancelled or out of attempts.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub todo_id: Uuid,
    pub user_id: Uuid,
    pub requested_by: Uuid,
    pub fire_at: DateTime<Utc>,
    pub calendar_trigger: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
