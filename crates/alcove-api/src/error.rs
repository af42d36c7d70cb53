use alcove_store::StoreError;
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with, mapped to a status code at the edge.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("not found")]
    NotFound,

    #[error("admin credentials required")]
    Unauthorized,

    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("confirmation does not match the room name")]
    ConfirmationMismatch,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidName(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ConfirmationMismatch => StatusCode::BAD_REQUEST,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidName(msg) => ApiError::InvalidName(msg),
            StoreError::NotFound | StoreError::RoomMissing(_) => ApiError::NotFound,
            StoreError::TooLarge { limit } => ApiError::TooLarge { limit },
            StoreError::Body(msg) => ApiError::BadRequest(msg),
            StoreError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<askama::Error> for ApiError {
    fn from(err: askama::Error) -> Self {
        ApiError::Internal(format!("template: {}", err))
    }
}

/// Multipart framing errors. The body limit layer reports 413 through here.
pub fn multipart_error(err: MultipartError, limit: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge { limit }
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Internal(detail) => {
                error!("Request failed: {}", detail);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}
