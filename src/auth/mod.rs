//! Bearer tokens and password login.

mod login;

pub use login::*;

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Invalid token payload")]
    MissingSubject,
    #[error("Failed to sign token")]
    Signing,
}

/// HS256 token issuer and verifier sharing one secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: config.token_ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `subject`, valid for the configured TTL.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: Some(now),
            exp: now + self.ttl.as_secs() as i64,
            jti: Some(uuid::Uuid::new_v4().to_string()),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(
            |e| {
                tracing::error!("Token signing failed: {}", e);
                TokenError::Signing
            },
        )
    }

    /// Verify signature and expiry and return the non-empty subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        let sub = data.claims.sub.trim();
        if sub.is_empty() {
            return Err(TokenError::MissingSubject);
        }
        Ok(sub.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str, ttl: u64) -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::new(secret, Duration::from_secs(ttl)))
    }

    #[test]
    fn issued_token_verifies_to_subject() {
        let tokens = issuer("secret", 60);
        let token = tokens.issue("user123").unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "user123");
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issuer("one", 60).issue("user123").unwrap();
        assert_eq!(issuer("two", 60).verify(&token), Err(TokenError::Invalid));
        assert_eq!(issuer("one", 60).verify("garbage"), Err(TokenError::Invalid));
    }

    #[test]
    fn expired_token_is_reported() {
        let tokens = issuer("secret", 60);
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user123".to_string(),
            iat: Some(now - 120),
            exp: now - 60,
            jti: None,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_with_only_subject_and_expiry_verifies() {
        let tokens = issuer("secret", 60);
        let claims = serde_json::json!({
            "sub": "user123",
            "exp": Utc::now().timestamp() + 60,
        });
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "user123");
    }

    #[test]
    fn blank_subject_is_rejected() {
        let tokens = issuer("secret", 60);
        let token = tokens.issue("  ").unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::MissingSubject));
    }

    #[test]
    fn each_token_is_unique() {
        let tokens = issuer("secret", 60);
        assert_ne!(tokens.issue("a").unwrap(), tokens.issue("a").unwrap());
    }
}
