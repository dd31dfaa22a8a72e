use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{jwt, tokens};
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;

/// The caller resolved from a bearer token that is validly signed, unexpired,
/// matches the user's current session, and belongs to a non-deleted user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .ok_or_else(|| AppError::Unauthorized("Please send the authorization token".to_string()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let token = tokens::bearer_token(header)
            .ok_or_else(|| AppError::Unauthorized("Please send the authorization token".to_string()))?;

        let claims = jwt::decode_token(token, &state.config.jwt_secret).map_err(|e| {
            tracing::debug!("Rejected bearer token: {e}");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        let session = db::sessions::find_live(&state.pool, &tokens::hash_token(token), Utc::now())
            .await?
            .filter(|session| session.user_id == claims.sub)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: session.user_id,
        })
    }
}
