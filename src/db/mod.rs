mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::*;

const ACCOUNT_COLUMNS: &str =
    "user_id, email, password_hash, role, fail_count, is_locked, locked_at, created_at, updated_at";

/// Account storage. Every statement runs under one connection mutex, so
/// single-statement updates are atomic with respect to each other.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "ssot-forge")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("accounts.db");
        Self::open(db_path)
    }

    /// `path` when given, otherwise the platform data directory.
    pub fn open_or_default(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::open(path),
            None => Self::open_default(),
        }
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Account operations
    // ============================================================

    /// Insert an account with an already-hashed password.
    pub fn create_account(&self, input: &CreateAccountInput, password_hash: &str) -> Result<Account> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO accounts (user_id, email, password_hash, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                &input.user_id,
                &input.email,
                password_hash,
                &input.role,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Account {
            user_id: input.user_id.clone(),
            email: input.email.clone(),
            password_hash: password_hash.to_string(),
            role: input.role.clone(),
            fail_count: 0,
            is_locked: false,
            locked_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let account = conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE email = ?", ACCOUNT_COLUMNS),
                [email],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    pub fn get_account(&self, user_id: &str) -> Result<Option<Account>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let account = conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE user_id = ?", ACCOUNT_COLUMNS),
                [user_id],
                row_to_account,
            )
            .optional()?;
        Ok(account)
    }

    /// Count one wrong password and lock once the count reaches `max_fail_count`.
    ///
    /// Increment and compare happen in a single statement. Returns `None` when
    /// the account is already locked (or gone), in which case nothing changes.
    pub fn record_login_failure(
        &self,
        user_id: &str,
        max_fail_count: u32,
    ) -> Result<Option<FailureOutcome>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now().to_rfc3339();

        let outcome = conn
            .query_row(
                "UPDATE accounts SET
                    fail_count = fail_count + 1,
                    is_locked = CASE WHEN fail_count + 1 >= ?2 THEN 1 ELSE 0 END,
                    locked_at = CASE WHEN fail_count + 1 >= ?2 THEN ?3 ELSE locked_at END,
                    updated_at = ?3
                 WHERE user_id = ?1 AND is_locked = 0
                 RETURNING fail_count, is_locked",
                (user_id, max_fail_count, &now),
                |row| {
                    Ok(FailureOutcome {
                        fail_count: row.get(0)?,
                        locked: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(outcome)
    }

    /// Clear the failure counter after a correct password.
    ///
    /// Only applies while unlocked; returns false if the account was locked
    /// in the meantime.
    pub fn reset_login_failures(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE accounts SET fail_count = 0, updated_at = ?
             WHERE user_id = ? AND is_locked = 0",
            (Utc::now().to_rfc3339(), user_id),
        )?;
        Ok(rows > 0)
    }

    /// Operator unlock. Returns false when no account has this email.
    pub fn unlock_account(&self, email: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE accounts SET is_locked = 0, locked_at = NULL, fail_count = 0, updated_at = ?
             WHERE email = ?",
            (Utc::now().to_rfc3339(), email),
        )?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        user_id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        fail_count: row.get(4)?,
        is_locked: row.get(5)?,
        locked_at: row.get::<_, Option<String>>(6)?.map(parse_datetime),
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
