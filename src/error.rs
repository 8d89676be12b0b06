//! 统一的 API 错误类型与转换。

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::io::ErrorKind;

use crate::storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Internal(String),
    Unauthorized(HeaderMap),
    StorageUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
            ApiError::Unauthorized(headers) => {
                (StatusCode::UNAUTHORIZED, headers, "Authentication required").into_response()
            }
            ApiError::StorageUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage not available").into_response()
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Unavailable => ApiError::StorageUnavailable,
            StorageError::InvalidName | StorageError::NotFound => ApiError::NotFound,
            StorageError::Io(err) => match err.kind() {
                ErrorKind::NotFound => ApiError::NotFound,
                _ => ApiError::Internal(err.to_string()),
            },
        }
    }
}
