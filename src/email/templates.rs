/// Plain-text body of a reminder, also used when no SMTP relay is configured.
pub fn reminder_text(name: &str, todo_name: &str) -> String {
    format!("Hey {name}, This is a gentle reminder that the todo item {todo_name} has scheduled")
}

pub fn render_reminder(name: &str, todo_name: &str) -> String {
    let text = reminder_text(&escape(name), &escape(todo_name));
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Todo Scheduled</h2>
    <p>{text}</p>
</body>
</html>"#
    )
}

/// The token is pasted into the client, which posts it to `/users/resetPassword`.
pub fn render_password_reset(token: &str, ttl_minutes: i64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Password Reset</h2>
    <p>A password reset was requested for your account. Use this reset token to choose a new password:</p>
    <p style="font-family: monospace; font-size: 16px; word-break: break-all;">{token}</p>
    <p>The token expires in {ttl_minutes} minutes and can be used once.</p>
    <p style="color: #666; font-size: 14px;">If you didn't request this, you can ignore it.</p>
</body>
</html>"#
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
