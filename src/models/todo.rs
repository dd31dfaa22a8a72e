use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum TodoStatus {
    Pending,
    Completed,
    Expired,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::Completed => "completed",
            TodoStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TodoStatus::Pending),
            "completed" => Ok(TodoStatus::Completed),
            "expired" => Ok(TodoStatus::Expired),
            other => Err(format!("Unknown todo status: {other}")),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub name: String,
    pub expiration_time: DateTime<Utc>,
    pub added_by: Uuid,
    pub status: TodoStatus,
    pub is_deleted: bool,
    pub deleted_by: Option<Uuid>,
    pub restored_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single-record projection returned by create, update and get.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoView {
    pub id: Uuid,
    pub todo_name: String,
    pub expiration_time: DateTime<Utc>,
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row projection returned by the list route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoListItem {
    pub id: Uuid,
    pub todo_name: String,
    pub status: TodoStatus,
    pub is_deleted: bool,
    pub expiration_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Todo> for TodoView {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            todo_name: todo.name,
            expiration_time: todo.expiration_time,
            status: todo.status,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

impl From<Todo> for TodoListItem {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            todo_name: todo.name,
            status: todo.status,
            is_deleted: todo.is_deleted,
            expiration_time: todo.expiration_time,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}
