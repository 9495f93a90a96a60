use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::BackendError;

const INVALID_VALUE: u32 = 2001;
const NOT_FOUND: u32 = 2501;
const PASSWORD_WRONG: u32 = 8002;
const SCOPE_MISSING: u32 = 9101;
const AUTH_REFRESH_TOKEN_INVALID: u32 = 10013;

/// Errors returned by the HTTP handlers
#[derive(Debug)]
pub enum ApiError {
    Backend(BackendError),
    BadRequest(String),
    Unauthorized(String),
}

impl ApiError {
    fn code(&self) -> u32 {
        match self {
            ApiError::Backend(err) => match err {
                BackendError::AccountNotFound(_) | BackendError::NotFound { .. } => NOT_FOUND,
                BackendError::InvalidState(_) | BackendError::InvalidEventId(_) => INVALID_VALUE,
                BackendError::AuthFailed(_) => PASSWORD_WRONG,
                BackendError::ScopeError { .. } => SCOPE_MISSING,
                BackendError::SessionExpired(_) => AUTH_REFRESH_TOKEN_INVALID,
            },
            ApiError::BadRequest(_) => INVALID_VALUE,
            ApiError::Unauthorized(_) => PASSWORD_WRONG,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Backend(err) => match err {
                BackendError::AccountNotFound(_) | BackendError::NotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                BackendError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BackendError::InvalidEventId(_) => StatusCode::BAD_REQUEST,
                BackendError::AuthFailed(_) | BackendError::SessionExpired(_) => {
                    StatusCode::UNAUTHORIZED
                }
                BackendError::ScopeError { .. } => StatusCode::FORBIDDEN,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Backend(err) => err.to_string(),
            ApiError::BadRequest(m) | ApiError::Unauthorized(m) => m.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "Code": self.code(),
            "Error": self.message(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        ApiError::Backend(err)
    }
}
