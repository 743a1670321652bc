use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default role for new accounts.
pub const DEFAULT_ROLE: &str = "USER";

/// A stored login identity.
///
/// `fail_count` counts consecutive wrong passwords. Reaching the configured
/// threshold sets `is_locked`, after which even the correct password is
/// rejected until an operator unlocks the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub fail_count: u32,
    pub is_locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account. The password is hashed before storage.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountInput {
    pub user_id: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

/// Result of recording one wrong password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub fail_count: u32,
    pub locked: bool,
}
