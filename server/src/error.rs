use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use derive_more::derive::Display;
use serde_json::json;

use crate::auth::jwt::AuthError;

pub type AppResult<T> = Result<T, AppError>;
pub type AppJsonResult<T> = AppResult<Json<T>>;

#[derive(Debug, Display)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
    Unauthorized(String),
    Forbidden(String),
    ServiceUnavailable(String),
    DbError(sea_orm::error::DbErr),
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(error)
    }
}

impl From<sea_orm::error::DbErr> for AppError {
    fn from(error: sea_orm::error::DbErr) -> Self {
        AppError::DbError(error)
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingCredentials => {
                AppError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidToken => AppError::Unauthorized("Invalid Token".to_string()),
            AuthError::KeysUnavailable => {
                AppError::ServiceUnavailable("Token signing keys unavailable".to_string())
            }
            AuthError::TokenCreation => AppError::Internal(anyhow::anyhow!("Error creating token")),
            AuthError::Misconfigured(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(json!({"error": {
            "code": status.as_u16(),
            "message": message.into()
        }})),
    )
}

// This centralizes all different errors from our app in one place
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => error_body(StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => error_body(StatusCode::FORBIDDEN, msg),
            AppError::ServiceUnavailable(msg) => error_body(StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::DbError(err) => {
                tracing::error!("Database error: {:?}", err);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
        };
        tracing::debug!("Error response: {:?}", err.1);

        err.into_response()
    }
}
