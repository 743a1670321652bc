use serde::{Deserialize, Serialize};

/// Login body. Fields are optional so presence is checked by validation
/// rather than by the decoder; unknown fields are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `POST /api/login_api` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginTokenResponse {
    pub access_token: String,
    pub user_id: String,
}

/// `POST /api/login` success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginProfileResponse {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

/// Stable error codes returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingRequiredField,
    InvalidEmailFormat,
    InvalidPasswordFormat,
    InvalidRequest,
    InvalidQuestion,
    DangerousQuestion,
    InvalidToken,
    LoginFailed,
    AccountLocked,
    UpstreamUnavailable,
    InternalServerError,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: ErrorCode,
    pub detail: String,
}
