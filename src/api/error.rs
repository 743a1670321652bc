use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::auth::{LoginError, TokenError};
use crate::models::{ErrorBody, ErrorCode};
use crate::validation::ValidationError;

/// A rejected request: status plus the stable `{ errorCode, detail }` body.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            code,
            detail: detail.into(),
        }
    }

    pub fn bad_request(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, detail)
    }

    pub fn unauthorized(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, detail)
    }

    pub fn invalid_request() -> Self {
        Self::bad_request(ErrorCode::InvalidRequest, "request body is not valid JSON")
    }

    /// Log the full error server-side; the client only sees a generic message.
    pub fn internal(e: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", e);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalServerError,
            "Internal server error",
        )
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        tracing::debug!("Validation failed: {:?}", e.code);
        Self::bad_request(e.code, e.detail)
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Signing => Self::internal(e),
            _ => Self::unauthorized(ErrorCode::InvalidToken, e.to_string()),
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(e: LoginError) -> Self {
        match e {
            LoginError::Failed => Self::unauthorized(ErrorCode::LoginFailed, e.to_string()),
            LoginError::Locked => Self::unauthorized(ErrorCode::AccountLocked, e.to_string()),
            LoginError::Storage(e) => Self::internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error_code: self.code,
            detail: self.detail,
        });

        if self.status == StatusCode::UNAUTHORIZED && self.code == ErrorCode::InvalidToken {
            return (
                self.status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                body,
            )
                .into_response();
        }
        (self.status, body).into_response()
    }
}
