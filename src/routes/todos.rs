use axum::Json;
use axum::extract::{Path, State};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::todos::ListParams;
use crate::error::{AppError, is_unique_violation};
use crate::lifecycle;
use crate::models::TodoStatus;
use crate::models::todo::{TodoListItem, TodoView};
use crate::response::{ApiJson, ApiPath, ApiResult, ok_with, require_fields};
use crate::state::SharedState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUpdateTodo {
    pub todo_id: Option<Uuid>,
    pub todo_name: Option<String>,
    pub expiration_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatus {
    pub todo_ids: Option<Vec<Uuid>>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoIds {
    pub todo_ids: Option<Vec<Uuid>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTodos {
    pub page: Option<i64>,
    pub pagesize: Option<i64>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_expired: bool,
}

fn name_conflict() -> AppError {
    AppError::Conflict("A todo with this name already exists".to_string())
}

fn map_name_violation(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        name_conflict()
    } else {
        AppError::Database(e)
    }
}

fn require_ids(ids: Option<Vec<Uuid>>) -> Result<Vec<Uuid>, AppError> {
    ids.filter(|ids| !ids.is_empty())
        .ok_or_else(|| AppError::BadRequest("Please send the todoIds".to_string()))
}

pub async fn add_update(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<AddUpdateTodo>,
) -> ApiResult {
    let now = Utc::now();

    if let Some(expiration) = req.expiration_time {
        lifecycle::validate_expiration(expiration, now)?;
    }

    let name = req
        .todo_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(lifecycle::normalize_name)
        .transpose()?;

    if let Some(todo_id) = req.todo_id {
        db::todos::find_owned(&state.pool, todo_id, auth.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Todo does not exist".to_string()))?;

        if let Some(name) = name.as_deref() {
            if db::todos::name_taken(&state.pool, name, Some(todo_id)).await? {
                return Err(name_conflict());
            }
        }

        let todo = db::todos::update(
            &state.pool,
            todo_id,
            auth.user_id,
            name.as_deref(),
            req.expiration_time,
            now,
        )
        .await
        .map_err(map_name_violation)?;

        return ok_with("Details updated", json!({ "todo": TodoView::from(todo) }));
    }

    require_fields(&[
        ("todoName", name.is_some()),
        ("expirationTime", req.expiration_time.is_some()),
    ])?;
    let (Some(name), Some(expiration)) = (name, req.expiration_time) else {
        return Err(AppError::BadRequest("Please send proper data".to_string()));
    };

    if db::todos::name_taken(&state.pool, &name, None).await? {
        return Err(name_conflict());
    }

    let todo = db::todos::create(&state.pool, &name, expiration, auth.user_id)
        .await
        .map_err(map_name_violation)?;

    tracing::info!("User {} created todo {}", auth.user_id, todo.id);

    ok_with("Todo stored", json!({ "todo": TodoView::from(todo) }))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Path(todo_id), _): ApiPath<Uuid>,
) -> ApiResult {
    let todo = db::todos::find_owned(&state.pool, todo_id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Todo does not exist".to_string()))?;

    ok_with("Details", json!({ "todo": TodoView::from(todo) }))
}

pub async fn change_status(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<ChangeStatus>,
) -> ApiResult {
    require_fields(&[
        ("todoIds", req.todo_ids.as_ref().is_some_and(|ids| !ids.is_empty())),
        ("status", req.status.as_deref().is_some_and(|s| !s.trim().is_empty())),
    ])?;

    let status: TodoStatus = req
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| {
            AppError::BadRequest("Status must be one of completed, pending, expired".to_string())
        })?;
    let ids = require_ids(req.todo_ids)?;

    let updated = db::todos::set_status(&state.pool, &ids, auth.user_id, status).await?;

    ok_with("Status updated", json!({ "updated": updated }))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<TodoIds>,
) -> ApiResult {
    let ids = require_ids(req.todo_ids)?;

    let deleted = db::todos::soft_delete(&state.pool, &ids, auth.user_id, auth.user_id).await?;

    ok_with("Todos deleted", json!({ "deleted": deleted }))
}

pub async fn restore(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<TodoIds>,
) -> ApiResult {
    let ids = require_ids(req.todo_ids)?;

    let restored = db::todos::restore(&state.pool, &ids, auth.user_id, auth.user_id, Utc::now())
        .await
        .map_err(map_name_violation)?;

    let mut skipped: Vec<Uuid> = ids.into_iter().filter(|id| !restored.contains(id)).collect();
    skipped.sort();
    skipped.dedup();

    ok_with(
        "Todos restored",
        json!({ "restored": restored.len(), "skipped": skipped }),
    )
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<ListTodos>,
) -> ApiResult {
    require_fields(&[
        ("page", req.page.is_some()),
        ("pagesize", req.pagesize.is_some()),
    ])?;

    let page = req.page.unwrap_or(1);
    let page_size = req.pagesize.unwrap_or(lifecycle::MAX_PAGE_SIZE);
    let (limit, offset) = lifecycle::page_window(page, page_size)?;

    let now = Utc::now();
    lifecycle::sweep_expired(&state.pool, now).await?;

    let params = ListParams {
        owner: auth.user_id,
        filter: lifecycle::select_filter(req.is_deleted, req.is_expired),
        now,
        limit,
        offset,
    };

    let todos: Vec<TodoListItem> = db::todos::list(&state.pool, &params)
        .await?
        .into_iter()
        .map(TodoListItem::from)
        .collect();
    let total = db::todos::count(&state.pool, &params).await?;

    ok_with(
        "Details",
        json!({
            "todosList": todos,
            "total": total,
            "page": page,
            "pagesize": page_size,
        }),
    )
}
