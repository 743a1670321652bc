use anyhow::Context;
use thiserror::Error;

use crate::db::Database;
use crate::models::{Account, CreateAccountInput, DEFAULT_ROLE};

pub const DEMO_EMAIL: &str = "user1@example.com";
pub const DEMO_PASSWORD: &str = "Password!1";
pub const DEMO_USER_ID: &str = "user1";

#[derive(Debug, Error)]
pub enum LoginError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("email or password is incorrect")]
    Failed,
    #[error("account is locked")]
    Locked,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Check credentials against storage and apply the lockout policy.
///
/// Blocking: runs bcrypt and SQLite on the calling thread.
pub fn authenticate(
    db: &Database,
    email: &str,
    password: &str,
    max_fail_count: u32,
) -> Result<Account, LoginError> {
    let Some(mut account) = db.get_account_by_email(email)? else {
        tracing::info!("Login failed: unknown email");
        return Err(LoginError::Failed);
    };

    if account.is_locked {
        tracing::warn!("Login rejected: account {} is locked", account.user_id);
        return Err(LoginError::Locked);
    }

    let matches = bcrypt::verify(password, &account.password_hash)
        .with_context(|| format!("Stored hash for {} is unreadable", account.user_id))?;

    if !matches {
        return match db.record_login_failure(&account.user_id, max_fail_count)? {
            Some(outcome) if outcome.locked => {
                tracing::warn!(
                    "Account {} locked after {} failed attempts",
                    account.user_id,
                    outcome.fail_count
                );
                Err(LoginError::Locked)
            }
            Some(outcome) => {
                tracing::info!(
                    "Login failed for {} ({}/{})",
                    account.user_id,
                    outcome.fail_count,
                    max_fail_count
                );
                Err(LoginError::Failed)
            }
            None => Err(LoginError::Locked),
        };
    }

    if !db.reset_login_failures(&account.user_id)? {
        return Err(LoginError::Locked);
    }

    account.fail_count = 0;
    tracing::info!("Login succeeded for {}", account.user_id);
    Ok(account)
}

/// Hash the password and store a new account.
pub fn create_account(
    db: &Database,
    input: &CreateAccountInput,
    bcrypt_cost: u32,
) -> anyhow::Result<Account> {
    let hash = bcrypt::hash(&input.password, bcrypt_cost).context("Failed to hash password")?;
    let account = db
        .create_account(input, &hash)
        .with_context(|| format!("Failed to create account {}", input.email))?;
    tracing::info!("Created account {} ({})", account.user_id, account.email);
    Ok(account)
}

/// Insert the demonstration account unless its email already exists.
/// Returns true when an account was created.
pub fn seed_demo_account(db: &Database, bcrypt_cost: u32) -> anyhow::Result<bool> {
    if db.get_account_by_email(DEMO_EMAIL)?.is_some() {
        return Ok(false);
    }

    let input = CreateAccountInput {
        user_id: DEMO_USER_ID.to_string(),
        email: DEMO_EMAIL.to_string(),
        password: DEMO_PASSWORD.to_string(),
        role: DEFAULT_ROLE.to_string(),
    };
    create_account(db, &input, bcrypt_cost)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    fn setup() -> Database {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let input = CreateAccountInput {
            user_id: "u1".to_string(),
            email: "user@example.com".to_string(),
            password: "Pass@word1".to_string(),
            role: DEFAULT_ROLE.to_string(),
        };
        create_account(&db, &input, COST).unwrap();
        db
    }

    #[test]
    fn correct_password_succeeds_and_resets_counter() {
        let db = setup();
        assert!(matches!(
            authenticate(&db, "user@example.com", "Wrong@pass1", 5),
            Err(LoginError::Failed)
        ));
        let account = authenticate(&db, "user@example.com", "Pass@word1", 5).unwrap();
        assert_eq!(account.user_id, "u1");
        assert_eq!(
            db.get_account("u1").unwrap().unwrap().fail_count,
            0
        );
    }

    #[test]
    fn unknown_email_fails_without_side_effects() {
        let db = setup();
        assert!(matches!(
            authenticate(&db, "nobody@example.com", "Pass@word1", 5),
            Err(LoginError::Failed)
        ));
    }

    #[test]
    fn threshold_locks_and_blocks_correct_password() {
        let db = setup();
        for _ in 0..2 {
            assert!(matches!(
                authenticate(&db, "user@example.com", "Wrong@pass1", 3),
                Err(LoginError::Failed)
            ));
        }
        assert!(matches!(
            authenticate(&db, "user@example.com", "Wrong@pass1", 3),
            Err(LoginError::Locked)
        ));
        assert!(matches!(
            authenticate(&db, "user@example.com", "Pass@word1", 3),
            Err(LoginError::Locked)
        ));

        let account = db.get_account("u1").unwrap().unwrap();
        assert!(account.is_locked);
        assert_eq!(account.fail_count, 3);
        assert!(account.locked_at.is_some());
    }

    #[test]
    fn demo_seed_is_idempotent() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        assert!(seed_demo_account(&db, COST).unwrap());
        assert!(!seed_demo_account(&db, COST).unwrap());
        assert!(authenticate(&db, DEMO_EMAIL, DEMO_PASSWORD, 5).is_ok());
    }
}
