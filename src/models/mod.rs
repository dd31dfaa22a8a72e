pub mod notification;
pub mod password_reset_token;
pub mod session;
pub mod todo;
pub mod user;

pub use notification::Notification;
pub use password_reset_token::PasswordResetToken;
pub use session::Session;
pub use todo::{Todo, TodoStatus};
pub use user::User;
