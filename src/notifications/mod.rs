//! One-shot email reminders for todos.
//!
//! Scheduling persists a row keyed by (todo, recipient, fire time); the worker
//! in [`crate::worker`] delivers it once and takes it out of the due set.

pub mod trigger;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db;
use crate::db::notifications::NewNotification;
use crate::error::{AppError, is_unique_violation};
use crate::models::{Notification, Todo, User};
use crate::state::SharedState;

use trigger::CalendarTrigger;

pub struct Scheduled {
    pub notification: Notification,
    pub recipient: User,
    pub todo: Todo,
}

pub async fn schedule(
    state: &SharedState,
    requested_by: Uuid,
    todo_id: Uuid,
    user_id: Uuid,
    fire_at: DateTime<Utc>,
) -> Result<Scheduled, AppError> {
    let recipient = db::users::find_by_id(&state.pool, user_id)
        .await?
        .filter(|user| !user.is_deleted)
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    let todo = db::todos::find_owned(&state.pool, todo_id, requested_by)
        .await?
        .filter(|todo| !todo.is_deleted)
        .ok_or_else(|| AppError::NotFound("Todo does not exist".to_string()))?;

    if fire_at < Utc::now() {
        return Err(AppError::BadRequest(
            "Schedule time should be greater than the current time".to_string(),
        ));
    }

    let calendar_trigger = CalendarTrigger::from_datetime(fire_at).to_string();

    let notification = db::notifications::create(
        &state.pool,
        &NewNotification {
            todo_id,
            user_id,
            requested_by,
            fire_at,
            calendar_trigger: &calendar_trigger,
            max_attempts: state.config.notify_max_attempts,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("This notification is already scheduled".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(
        "Scheduled notification {} for todo {} at {} ({})",
        notification.id,
        todo.id,
        fire_at,
        calendar_trigger
    );

    Ok(Scheduled {
        notification,
        recipient,
        todo,
    })
}
