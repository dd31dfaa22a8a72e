use axum::Json;
use axum::extract::Path;
use axum_extra::extract::WithRejection;
use serde::Serialize;

use crate::error::AppError;

/// JSON body extractor whose rejections render through [`AppError`].
pub type ApiJson<T> = WithRejection<Json<T>, AppError>;

/// Path extractor whose rejections render through [`AppError`].
pub type ApiPath<T> = WithRejection<Path<T>, AppError>;

pub type ApiResult = Result<Json<Envelope>, AppError>;

/// The `{status, message, data?, code?}` body every route answers with.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub status: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl Envelope {
    pub fn failure(message: String, code: &'static str) -> Self {
        Self {
            status: 0,
            message,
            data: None,
            code: Some(code),
        }
    }
}

pub fn ok(message: &str) -> ApiResult {
    Ok(Json(Envelope {
        status: 1,
        message: message.to_string(),
        data: None,
        code: None,
    }))
}

pub fn ok_with(message: &str, data: serde_json::Value) -> ApiResult {
    Ok(Json(Envelope {
        status: 1,
        message: message.to_string(),
        data: Some(data),
        code: None,
    }))
}

/// Fails with a validation error listing every field that is absent or blank.
pub fn require_fields(fields: &[(&str, bool)]) -> Result<(), AppError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Please send proper data. {} fields required.",
            missing.join(", ")
        )))
    }
}

/// A string field counts as present when it is non-blank.
pub fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}
