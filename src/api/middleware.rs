//! Bearer token authentication.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use super::error::ApiError;
use crate::auth::TokenIssuer;
use crate::models::ErrorCode;

/// Subject of a verified bearer token, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub mbr_id: String,
}

/// Reject requests without a valid `Authorization: Bearer <token>` header.
pub async fn require_bearer(
    State(tokens): State<TokenIssuer>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|h| h.to_str().unwrap_or_default());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => header[7..].trim(),
        Some(_) => {
            tracing::warn!("Invalid Authorization header format");
            return Err(ApiError::unauthorized(
                ErrorCode::InvalidToken,
                "Invalid Authorization header",
            ));
        }
        None => {
            tracing::warn!("Missing Authorization header");
            return Err(ApiError::unauthorized(
                ErrorCode::InvalidToken,
                "Missing Authorization header",
            ));
        }
    };

    let mbr_id = tokens.verify(token).map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(CurrentUser { mbr_id });
    Ok(next.run(request).await)
}
