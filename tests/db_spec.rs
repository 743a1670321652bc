use ssot_forge::db::Database;
use ssot_forge::models::*;
use speculate2::speculate;

fn create_test_account(db: &Database, user_id: &str, email: &str) -> Account {
    db.create_account(
        &CreateAccountInput {
            user_id: user_id.to_string(),
            email: email.to_string(),
            password: "unused".to_string(),
            role: DEFAULT_ROLE.to_string(),
        },
        "$2b$04$not-a-real-hash",
    )
    .expect("Failed to create account")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "accounts" {
        describe "create_account" {
            it "starts unlocked with a zero counter" {
                let account = create_test_account(&db, "u1", "user@example.com");

                assert_eq!(account.role, "USER");
                assert_eq!(account.fail_count, 0);
                assert!(!account.is_locked);
                assert!(account.locked_at.is_none());
            }

            it "rejects a duplicate email" {
                create_test_account(&db, "u1", "user@example.com");
                let result = db.create_account(
                    &CreateAccountInput {
                        user_id: "u2".to_string(),
                        email: "user@example.com".to_string(),
                        password: "unused".to_string(),
                        role: DEFAULT_ROLE.to_string(),
                    },
                    "hash",
                );
                assert!(result.is_err());
            }
        }

        describe "get_account_by_email" {
            it "returns None for an unknown email" {
                let found = db.get_account_by_email("nobody@example.com").expect("Query failed");
                assert!(found.is_none());
            }

            it "returns the stored account" {
                create_test_account(&db, "u1", "user@example.com");
                let found = db
                    .get_account_by_email("user@example.com")
                    .expect("Query failed")
                    .expect("Account not found");

                assert_eq!(found.user_id, "u1");
                assert_eq!(found.password_hash, "$2b$04$not-a-real-hash");
            }
        }
    }

    describe "login failures" {
        describe "record_login_failure" {
            it "counts below the threshold without locking" {
                create_test_account(&db, "u1", "user@example.com");

                let outcome = db.record_login_failure("u1", 3).expect("Update failed");
                assert_eq!(outcome, Some(FailureOutcome { fail_count: 1, locked: false }));

                let outcome = db.record_login_failure("u1", 3).expect("Update failed");
                assert_eq!(outcome, Some(FailureOutcome { fail_count: 2, locked: false }));
            }

            it "locks on reaching the threshold" {
                create_test_account(&db, "u1", "user@example.com");
                for _ in 0..2 {
                    db.record_login_failure("u1", 3).expect("Update failed");
                }

                let outcome = db.record_login_failure("u1", 3).expect("Update failed");
                assert_eq!(outcome, Some(FailureOutcome { fail_count: 3, locked: true }));

                let account = db.get_account("u1").expect("Query failed").expect("Missing");
                assert!(account.is_locked);
                assert!(account.locked_at.is_some());
            }

            it "leaves a locked account unchanged" {
                create_test_account(&db, "u1", "user@example.com");
                db.record_login_failure("u1", 1).expect("Update failed");

                let outcome = db.record_login_failure("u1", 1).expect("Update failed");
                assert!(outcome.is_none());

                let account = db.get_account("u1").expect("Query failed").expect("Missing");
                assert_eq!(account.fail_count, 1);
            }

            it "returns None for an unknown account" {
                let outcome = db.record_login_failure("ghost", 5).expect("Update failed");
                assert!(outcome.is_none());
            }
        }

        describe "concurrent failures" {
            it "never loses an increment" {
                create_test_account(&db, "u1", "user@example.com");

                let handles: Vec<_> = (0..8)
                    .map(|_| {
                        let db = db.clone();
                        std::thread::spawn(move || db.record_login_failure("u1", 100).expect("Update failed"))
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("Thread panicked");
                }

                let account = db.get_account("u1").expect("Query failed").expect("Missing");
                assert_eq!(account.fail_count, 8);
                assert!(!account.is_locked);
            }
        }

        describe "reset_login_failures" {
            it "clears the counter of an unlocked account" {
                create_test_account(&db, "u1", "user@example.com");
                db.record_login_failure("u1", 5).expect("Update failed");

                assert!(db.reset_login_failures("u1").expect("Update failed"));
                let account = db.get_account("u1").expect("Query failed").expect("Missing");
                assert_eq!(account.fail_count, 0);
            }

            it "does not touch a locked account" {
                create_test_account(&db, "u1", "user@example.com");
                db.record_login_failure("u1", 1).expect("Update failed");

                assert!(!db.reset_login_failures("u1").expect("Update failed"));
                let account = db.get_account("u1").expect("Query failed").expect("Missing");
                assert!(account.is_locked);
                assert_eq!(account.fail_count, 1);
            }
        }

        describe "unlock_account" {
            it "clears lock state and counter" {
                create_test_account(&db, "u1", "user@example.com");
                db.record_login_failure("u1", 1).expect("Update failed");

                assert!(db.unlock_account("user@example.com").expect("Update failed"));
                let account = db.get_account("u1").expect("Query failed").expect("Missing");
                assert!(!account.is_locked);
                assert!(account.locked_at.is_none());
                assert_eq!(account.fail_count, 0);
            }

            it "returns false for an unknown email" {
                assert!(!db.unlock_account("nobody@example.com").expect("Update failed"));
            }
        }
    }
}
