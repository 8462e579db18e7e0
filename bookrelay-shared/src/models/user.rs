/// User model and database operations
///
/// This module provides the User model and CRUD operations for
/// managing accounts. Users own books and participate in loans as
/// borrowers; roles are attached via the `user_roles` join table.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     enabled BOOLEAN NOT NULL DEFAULT TRUE,
///     account_locked BOOLEAN NOT NULL DEFAULT FALSE,
///     confirmed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bookrelay_shared::models::user::{CreateUser, User};
/// use bookrelay_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     email: "Ada@Example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// // Emails are normalized to lowercase on insert and lookup
/// let found = User::find_by_email(&pool, "ada@example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
/// `confirmed` starts false and flips when an activation code is
/// redeemed; login is gated on it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Email address, stored lowercase, unique across all users
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Whether the account is enabled (an operator kill switch)
    pub enabled: bool,

    /// Whether the account is locked (failed-login lockout)
    pub account_locked: bool,

    /// Whether the email address was confirmed via activation code
    pub confirmed: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Full display name, used in notification mails
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Email address (normalized to lowercase on insert)
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password!)
    pub password_hash: String,
}

impl User {
    /// Creates a new user in the database
    ///
    /// New accounts start `enabled`, unlocked, and unconfirmed.
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique
    /// constraint violation) or the database operation fails.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash)
            VALUES ($1, $2, LOWER($3), $4)
            RETURNING id, first_name, last_name, email, password_hash,
                      enabled, account_locked, confirmed,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email)
        .bind(data.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash,
                   enabled, account_locked, confirmed,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash,
                   enabled, account_locked, confirmed,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE email = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Marks the account as confirmed
    ///
    /// Idempotent: confirming an already-confirmed account is a no-op
    /// that still reports success.
    ///
    /// # Returns
    ///
    /// True if the user exists, false otherwise
    pub async fn confirm(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET confirmed = TRUE,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp for a user
    ///
    /// Called after successful authentication.
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            enabled: true,
            account_locked: false,
            confirmed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(sample_user().full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_create_user_struct() {
        let create = CreateUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
        };
        assert_eq!(create.email, "ada@example.com");
        assert_eq!(create.password_hash, "hash");
    }

    // Integration tests for database operations are in the API
    // crate's tests/ directory.
}
