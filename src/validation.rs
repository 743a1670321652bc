//! Input validation for the login and recommend services.
//!
//! Validation runs before any storage access. Each rule maps to one stable
//! [`ErrorCode`] so clients can branch on it.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ErrorCode;

pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const QUESTION_MAX_LEN: usize = 300;

const PASSWORD_SPECIALS: &str = "!@#$%^&*";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("Invalid email regex")
});

static SAFE_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[ㄱ-ㅎ가-힣a-zA-Z0-9\s.,!?()\[\]\-_:+/'"@#&]+$"#)
        .expect("Invalid question allow-list regex")
});

static SQL_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(select|insert|update|delete|drop|truncate|union|exec)\b")
        .expect("Invalid SQL keyword regex")
});

static SHELL_METACHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[;&|`$]").expect("Invalid metacharacter regex"));

/// A rejected input with the code and message returned to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub detail: String,
}

impl ValidationError {
    fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Credentials that passed validation.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Check login fields in order: presence, email format, password format.
pub fn validate_login<'a>(
    email: Option<&'a str>,
    password: Option<&'a str>,
) -> Result<Credentials<'a>, ValidationError> {
    let (Some(email), Some(password)) = (present(email), present(password)) else {
        return Err(ValidationError::new(
            ErrorCode::MissingRequiredField,
            "email and password are required",
        ));
    };

    if email.len() > EMAIL_MAX_LEN || !EMAIL.is_match(email) {
        return Err(ValidationError::new(
            ErrorCode::InvalidEmailFormat,
            "email format is invalid",
        ));
    }

    if !is_valid_password(password) {
        return Err(ValidationError::new(
            ErrorCode::InvalidPasswordFormat,
            format!(
                "password must be {}-{} characters with upper, lower, digit and one of {}",
                PASSWORD_MIN_LEN, PASSWORD_MAX_LEN, PASSWORD_SPECIALS
            ),
        ));
    }

    Ok(Credentials { email, password })
}

pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// Trim and check a recommend question. Returns the trimmed text.
pub fn validate_question(raw: &str) -> Result<String, ValidationError> {
    let question = raw.trim();
    let len = question.chars().count();

    if len == 0 || len > QUESTION_MAX_LEN {
        return Err(ValidationError::new(
            ErrorCode::InvalidQuestion,
            format!("question must be 1-{} characters", QUESTION_MAX_LEN),
        ));
    }

    if !SAFE_QUESTION.is_match(question) {
        return Err(ValidationError::new(
            ErrorCode::InvalidQuestion,
            "question contains unsupported characters",
        ));
    }

    if SQL_KEYWORDS.is_match(question) || SHELL_METACHARS.is_match(question) {
        return Err(ValidationError::new(
            ErrorCode::DangerousQuestion,
            "question contains disallowed patterns",
        ));
    }

    Ok(question.to_string())
}
