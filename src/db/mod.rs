pub mod notifications;
pub mod password_reset_tokens;
pub mod sessions;
pub mod todos;
pub mod users;
