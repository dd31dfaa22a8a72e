use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::db;
use crate::email::templates;
use crate::lifecycle;
use crate::notifications::trigger::CalendarTrigger;
use crate::state::SharedState;

/// Start the background jobs on a dedicated Tokio runtime with its own thread.
/// Runs until shutdown is signaled: one notification dispatcher and one expiry
/// sweeper.
pub fn run_pool(state: SharedState, shutdown: watch::Receiver<bool>) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("worker-pool".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("background-worker")
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to build worker runtime: {e}");
                    return;
                }
            };

            runtime.block_on(async {
                match db::notifications::requeue_stalled(&state.pool).await {
                    Ok(0) => {}
                    Ok(n) => tracing::warn!("Requeued {n} notification(s) left in processing"),
                    Err(e) => tracing::error!("Failed to requeue stalled notifications: {e}"),
                }

                let dispatcher = tokio::spawn(run_dispatcher(state.clone(), shutdown.clone()));
                let sweeper = tokio::spawn(run_sweeper(state.clone(), shutdown.clone()));

                tracing::info!("Background workers started");

                let _ = dispatcher.await;
                let _ = sweeper.await;

                tracing::info!("Background workers stopped");
            });
        })
        .expect("Failed to spawn worker pool thread")
}

async fn run_dispatcher(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let poll = Duration::from_secs(state.config.notify_poll_secs.max(1));

    loop {
        if *shutdown.borrow() {
            break;
        }

        match process_next(&state).await {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Notification dispatcher error: {e}");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(poll) => {}
            _ = shutdown.changed() => {}
        }
    }

    tracing::debug!("Notification dispatcher stopped");
}

async fn run_sweeper(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(
        state.config.sweep_interval_secs.max(1),
    ));

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {}
        }

        if *shutdown.borrow() {
            break;
        }

        if let Err(e) = lifecycle::sweep_expired(&state.pool, Utc::now()).await {
            tracing::error!("Expiry sweep failed: {e}");
        }
    }

    tracing::debug!("Expiry sweeper stopped");
}

/// Claim and deliver the next due notification. Returns true if one was handled.
pub async fn process_next(state: &SharedState) -> Result<bool, String> {
    let now = Utc::now();
    let item = db::notifications::claim_next(&state.pool, now)
        .await
        .map_err(|e| format!("Failed to claim notification: {e}"))?;

    let Some(item) = item else {
        return Ok(false);
    };

    tracing::debug!(
        "Processing notification {} (todo={}, user={}, attempt={})",
        item.id,
        item.todo_id,
        item.user_id,
        item.attempts
    );

    if !CalendarTrigger::from_datetime(item.fire_at).matches(now) {
        tracing::warn!(
            "Notification {} is late: due at {} ({})",
            item.id,
            item.fire_at,
            item.calendar_trigger
        );
    }

    let todo = db::todos::find_by_id(&state.pool, item.todo_id)
        .await
        .map_err(|e| format!("Failed to load todo: {e}"))?;
    let recipient = db::users::find_by_id(&state.pool, item.user_id)
        .await
        .map_err(|e| format!("Failed to load user: {e}"))?;

    let (todo, recipient) = match (todo, recipient) {
        (Some(todo), Some(user)) if !todo.is_deleted && !user.is_deleted => (todo, user),
        _ => {
            tracing::info!("Notification {} cancelled: todo or recipient removed", item.id);
            db::notifications::mark_finished(
                &state.pool,
                item.id,
                "cancelled",
                Some("todo or recipient removed"),
            )
            .await
            .map_err(|e| format!("Failed to cancel notification: {e}"))?;
            return Ok(true);
        }
    };

    let Some(mailer) = state.system_mailer.as_ref() else {
        tracing::warn!(
            "SMTP not configured. Reminder for {}: {}",
            recipient.email,
            templates::reminder_text(&recipient.display_name(), &todo.name)
        );
        db::notifications::mark_finished(&state.pool, item.id, "skipped", Some("SMTP not configured"))
            .await
            .map_err(|e| format!("Failed to update notification: {e}"))?;
        return Ok(true);
    };

    let sent = tokio::time::timeout(
        Duration::from_secs(30),
        mailer.send_reminder(&recipient.email, &recipient.display_name(), &todo.name),
    )
    .await
    .unwrap_or_else(|_| Err("Email send timed out after 30s".to_string()));

    match sent {
        Ok(()) => {
            tracing::info!("Notification {} sent to {}", item.id, recipient.email);
            db::notifications::mark_finished(&state.pool, item.id, "sent", None)
                .await
                .map_err(|e| format!("Failed to update notification: {e}"))?;
        }
        Err(error) => {
            tracing::warn!("Notification {} failed: {error}", item.id);
            db::notifications::mark_failed(
                &state.pool,
                item.id,
                item.attempts,
                item.max_attempts,
                &error,
            )
            .await
            .map_err(|e| format!("Failed to update notification: {e}"))?;
        }
    }

    Ok(true)
}
