use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    InvalidArgument(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use AppError::*;
        let (code, message) = match self {
            InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg),
            NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Conflict(msg) => (StatusCode::CONFLICT, msg),
            Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Internal(err) => {
                tracing::error!("internal error: {err}\n{}", err.backtrace());
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong".to_owned())
            }
        };

        (code, Json(json!({ "message": message }))).into_response()
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        Self::Internal(anyhow::Error::msg(err))
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        Self::Internal(anyhow::Error::msg(err.to_owned()))
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(serde_json::Error);
apperr_impl!(sqlx::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
