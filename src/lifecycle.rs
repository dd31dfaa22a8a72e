//! Status and visibility rules for todos.
//!
//! A todo starts `pending` and can be moved between the three statuses
//! explicitly. Once its expiration passes, [`sweep_expired`] forces it to
//! `expired` whatever its status.
//! Soft delete hides it from the default views; restore brings it back with a
//! status recomputed against the current time.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::todos::ListFilter;
use crate::error::AppError;

pub const MAX_PAGE_SIZE: i64 = 100;

/// Expiration must lie strictly in the future.
pub fn validate_expiration(expiration: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AppError> {
    if expiration <= now {
        return Err(AppError::BadRequest(
            "Expiration time should be greater than the current time".to_string(),
        ));
    }
    Ok(())
}

/// Names are compared and stored trimmed. Blank names are rejected.
pub fn normalize_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Todo name must not be blank".to_string()));
    }
    Ok(trimmed.to_string())
}

/// `isExpired` takes precedence over `isDeleted`; neither means the active view.
pub fn select_filter(is_deleted: bool, is_expired: bool) -> ListFilter {
    if is_expired {
        ListFilter::Expired
    } else if is_deleted {
        ListFilter::Deleted
    } else {
        ListFilter::Active
    }
}

/// Turns 1-based page numbers into `(limit, offset)`.
pub fn page_window(page: i64, page_size: i64) -> Result<(i64, i64), AppError> {
    if page < 1 {
        return Err(AppError::BadRequest("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::BadRequest(format!(
            "pagesize must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    Ok((page_size, (page - 1) * page_size))
}

/// Expire every todo whose expiration has passed. Idempotent; used by
/// the list route before reading and by the background sweeper.
pub async fn sweep_expired(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let expired = crate::db::todos::sweep_expired(pool, now).await?;
    if expired > 0 {
        tracing::info!("Expired {expired} todo(s)");
    }
    Ok(expired)
}
