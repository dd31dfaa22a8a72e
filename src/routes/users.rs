use std::sync::LazyLock;

use axum::Json;
use axum::extract::State;
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{Claims, encode_token};
use crate::auth::{password, tokens};
use crate::db;
use crate::db::users::NewUser;
use crate::error::{AppError, is_unique_violation};
use crate::models::user::Profile;
use crate::notifications;
use crate::response::{ApiJson, ApiResult, ok, ok_with, present, require_fields};
use crate::state::SharedState;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{6,15}$").expect("valid mobile regex"));

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email_id: Option<String>,
    pub password: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub mobile: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub mobile: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleNotificationRequest {
    pub todo_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub schedule_time: Option<DateTime<Utc>>,
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::BadRequest("Please send a valid email address".to_string()));
    }
    Ok(email)
}

fn validate_mobile(mobile: &str) -> Result<String, AppError> {
    let mobile = mobile.trim();
    if !MOBILE_RE.is_match(mobile) {
        return Err(AppError::BadRequest("Please send a valid mobile number".to_string()));
    }
    Ok(mobile.to_string())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < password::MIN_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            password::MIN_LENGTH
        )));
    }
    Ok(())
}

pub async fn register(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<RegisterRequest>,
) -> ApiResult {
    require_fields(&[
        ("emailId", present(&req.email_id)),
        ("password", present(&req.password)),
        ("firstname", present(&req.firstname)),
        ("lastname", present(&req.lastname)),
        ("mobile", present(&req.mobile)),
    ])?;

    let email = normalize_email(req.email_id.as_deref().unwrap_or_default())?;
    let mobile = validate_mobile(req.mobile.as_deref().unwrap_or_default())?;
    let raw_password = req.password.unwrap_or_default();
    validate_password(&raw_password)?;

    if db::users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict("Email is already registered".to_string()));
    }
    if db::users::mobile_taken(&state.pool, &mobile, None).await? {
        return Err(AppError::Conflict("Mobile number is already registered".to_string()));
    }

    let pw_hash = password::hash(&raw_password).map_err(AppError::Internal)?;

    let user = db::users::create(
        &state.pool,
        &NewUser {
            email: &email,
            password_hash: &pw_hash,
            first_name: req.firstname.as_deref().unwrap_or_default().trim(),
            last_name: req.lastname.as_deref().unwrap_or_default().trim(),
            mobile: &mobile,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Email or mobile number is already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!("Registered user {}", user.id);

    ok("Registration successful")
}

pub async fn login(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<LoginRequest>,
) -> ApiResult {
    require_fields(&[
        ("emailId", present(&req.email_id)),
        ("password", present(&req.password)),
    ])?;

    let email = req.email_id.as_deref().unwrap_or_default().trim().to_lowercase();

    let user = db::users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if user.is_deleted {
        return Err(AppError::Unauthorized("This account has been deleted".to_string()));
    }

    let valid = password::verify(req.password.as_deref().unwrap_or_default(), &user.password_hash)
        .map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let claims = Claims::new(user.id, state.config.session_ttl_minutes);
    let access_token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    db::sessions::replace(
        &state.pool,
        user.id,
        &tokens::hash_token(&access_token),
        claims.expires_at(),
    )
    .await?;

    let now = Utc::now();
    db::users::touch_last_seen(&state.pool, user.id, now).await?;

    tracing::info!("User {} logged in", user.id);

    ok_with("Login successful", json!({ "accessToken": access_token }))
}

pub async fn profile(auth: AuthUser, State(state): State<SharedState>) -> ApiResult {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    ok_with("Details", json!({ "user": Profile::from(user) }))
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<UpdateProfileRequest>,
) -> ApiResult {
    if !present(&req.firstname) && !present(&req.lastname) && !present(&req.mobile) {
        return Err(AppError::BadRequest(
            "Please send at least one of firstname, lastname, mobile".to_string(),
        ));
    }

    let mobile = match req.mobile.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(mobile) => {
            let mobile = validate_mobile(mobile)?;
            if db::users::mobile_taken(&state.pool, &mobile, Some(auth.user_id)).await? {
                return Err(AppError::Conflict("Mobile number is already registered".to_string()));
            }
            Some(mobile)
        }
        None => None,
    };

    let first_name = req.firstname.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let last_name = req.lastname.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let user = db::users::update_profile(
        &state.pool,
        auth.user_id,
        first_name,
        last_name,
        mobile.as_deref(),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Mobile number is already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    ok_with("Details updated", json!({ "user": Profile::from(user) }))
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<ForgotPasswordRequest>,
) -> ApiResult {
    require_fields(&[("emailId", present(&req.email_id))])?;
    let email = req.email_id.as_deref().unwrap_or_default().trim().to_lowercase();

    // Answer the same way whether or not the address exists.
    let pool = state.pool.clone();
    let mailer = state.system_mailer.clone();
    let ttl_minutes = state.config.reset_token_ttl_minutes;

    tokio::spawn(async move {
        let user = match db::users::find_by_email(&pool, &email).await {
            Ok(Some(user)) if !user.is_deleted => user,
            Ok(_) => return,
            Err(e) => {
                tracing::error!("Password reset lookup failed: {e}");
                return;
            }
        };

        let token = tokens::generate_token();
        if let Err(e) = db::password_reset_tokens::create(
            &pool,
            user.id,
            &tokens::hash_token(&token),
            Utc::now() + Duration::minutes(ttl_minutes),
        )
        .await
        {
            tracing::error!("Failed to store password reset token: {e}");
            return;
        }

        if let Some(mailer) = mailer {
            if let Err(e) = mailer.send_password_reset(&user.email, &token, ttl_minutes).await {
                tracing::error!("Failed to send password reset email: {e}");
            }
        } else {
            tracing::warn!("SMTP not configured. Password reset token for {}: {token}", user.email);
        }
    });

    ok("If that email is registered, a reset token has been sent")
}

pub async fn reset_password(
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<ResetPasswordRequest>,
) -> ApiResult {
    require_fields(&[
        ("token", present(&req.token)),
        ("password", present(&req.password)),
    ])?;

    let new_password = req.password.as_deref().unwrap_or_default().trim();
    validate_password(new_password)?;
    let pw_hash = password::hash(new_password).map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;

    let reset = db::password_reset_tokens::consume(
        &mut *tx,
        &tokens::hash_token(req.token.as_deref().unwrap_or_default().trim()),
        Utc::now(),
    )
    .await?
    .ok_or_else(|| AppError::BadRequest("Reset link is invalid or has expired".to_string()))?;

    db::users::update_password(&mut *tx, reset.user_id, &pw_hash).await?;
    db::sessions::delete_for_user(&mut *tx, reset.user_id).await?;

    tx.commit().await?;

    tracing::info!("Password reset for user {}", reset.user_id);

    ok("Password updated successfully")
}

pub async fn schedule_notifications(
    auth: AuthUser,
    State(state): State<SharedState>,
    WithRejection(Json(req), _): ApiJson<ScheduleNotificationRequest>,
) -> ApiResult {
    require_fields(&[
        ("scheduleTime", req.schedule_time.is_some()),
        ("todoId", req.todo_id.is_some()),
        ("userId", req.user_id.is_some()),
    ])?;

    let (Some(todo_id), Some(user_id), Some(fire_at)) =
        (req.todo_id, req.user_id, req.schedule_time)
    else {
        return Err(AppError::BadRequest("Please send proper data".to_string()));
    };

    let scheduled = notifications::schedule(&state, auth.user_id, todo_id, user_id, fire_at).await?;

    let message = format!(
        "Notification for the user {} has been scheduled on the todo {}",
        scheduled.recipient.display_name(),
        scheduled.todo.name
    );

    ok_with(&message, json!({ "notification": scheduled.notification }))
}
