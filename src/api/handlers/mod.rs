use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::ApiError;
use super::middleware::CurrentUser;
use super::{GatewayState, LoginState};
use crate::auth;
use crate::models::*;
use crate::validation;

pub const DEFAULT_MBR_ID: &str = "user123";
pub const DEFAULT_QUESTION: &str = "키보드 추천해줘";

/// Decode a body that must be a JSON object matching `T`.
fn parse_object<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ApiError::invalid_request())?;
    if !value.is_object() {
        return Err(ApiError::invalid_request());
    }
    serde_json::from_value(value).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ApiError::invalid_request()
    })
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Recommend
// ============================================================

pub async fn recommend(
    Extension(user): Extension<CurrentUser>,
    body: Bytes,
) -> Result<Json<RecommendResponse>, ApiError> {
    let request: QuestionRequest = parse_object(&body)?;
    let question = validation::validate_question(&request.question)?;

    let wrapped_question = serde_json::to_string(&QuestionRequest {
        question: question.clone(),
    })
    .map_err(ApiError::internal)?;

    tracing::info!("Recommend request from mbr_id={}", user.mbr_id);

    let answer = format!(
        "[mbr_id={}] Your question is '{}'. (recommendation logic goes here)",
        user.mbr_id, question
    );

    Ok(Json(RecommendResponse {
        mbr_id: user.mbr_id,
        question,
        wrapped_question,
        answer,
    }))
}

// ============================================================
// Gateway
// ============================================================

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub mbr_id: Option<String>,
    pub question: Option<String>,
}

/// Issue a token for the member and relay the recommend response unchanged.
pub async fn ask(
    State(state): State<GatewayState>,
    Query(params): Query<AskParams>,
) -> Result<Response, ApiError> {
    let mbr_id = params.mbr_id.unwrap_or_else(|| DEFAULT_MBR_ID.to_string());
    let question = params
        .question
        .unwrap_or_else(|| DEFAULT_QUESTION.to_string());

    if mbr_id.trim().is_empty() || question.trim().is_empty() {
        return Err(ApiError::bad_request(
            ErrorCode::MissingRequiredField,
            "mbr_id and question are required",
        ));
    }

    let token = state.tokens.issue(&mbr_id)?;

    let upstream_error = |e: reqwest::Error| {
        tracing::error!("Recommend call to {} failed: {}", state.config.recommend_url, e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::UpstreamUnavailable,
            "recommend service is unavailable",
        )
    };

    let upstream = state
        .client
        .post(&state.config.recommend_url)
        .bearer_auth(token)
        .json(&QuestionRequest { question })
        .timeout(state.config.timeout)
        .send()
        .await
        .map_err(upstream_error)?;

    let status = upstream.status();
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("application/json"));
    let bytes = upstream.bytes().await.map_err(upstream_error)?;

    tracing::info!("Relayed recommend response ({}) for mbr_id={}", status, mbr_id);

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .map_err(ApiError::internal)
}

// ============================================================
// Login
// ============================================================

/// Validate the body, then authenticate on the blocking pool.
async fn check_login(state: &LoginState, body: &Bytes) -> Result<Account, ApiError> {
    let request: LoginRequest = parse_object(body)?;
    let creds = validation::validate_login(request.email.as_deref(), request.password.as_deref())?;

    let db = state.db.clone();
    let email = creds.email.to_string();
    let password = creds.password.to_string();
    let max_fail_count = state.config.max_fail_count;

    let account = tokio::task::spawn_blocking(move || {
        auth::authenticate(&db, &email, &password, max_fail_count)
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(account)
}

pub async fn login_api(
    State(state): State<LoginState>,
    body: Bytes,
) -> Result<Json<LoginTokenResponse>, ApiError> {
    let account = check_login(&state, &body).await?;
    let access_token = state.tokens.issue(&account.user_id)?;

    Ok(Json(LoginTokenResponse {
        access_token,
        user_id: account.user_id,
    }))
}

pub async fn login(
    State(state): State<LoginState>,
    body: Bytes,
) -> Result<Json<LoginProfileResponse>, ApiError> {
    let account = check_login(&state, &body).await?;

    Ok(Json(LoginProfileResponse {
        user_id: account.user_id,
        email: account.email,
        role: account.role,
    }))
}
