pub mod todos;
pub mod users;

use axum::Router;
use axum::routing::{delete, get, post, put};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Users
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/profile", get(users::profile))
        .route("/users/updateProfile", post(users::update_profile))
        .route("/users/forgotPassword", post(users::forgot_password))
        .route("/users/resetPassword", post(users::reset_password))
        .route(
            "/users/scheduleNotifications",
            post(users::schedule_notifications),
        )
        // Todos
        .route("/todos/addUpdateTodo", post(todos::add_update))
        .route("/todos/getTodo/{todo_id}", get(todos::get))
        .route("/todos/changeStatus", put(todos::change_status))
        .route("/todos/deleteTodo", delete(todos::delete))
        .route("/todos/list", post(todos::list))
        .route("/todos/restoreTodos", post(todos::restore))
}
