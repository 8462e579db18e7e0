/// Activation token model
///
/// An activation token is a short-lived 6-digit code mailed to a new
/// account's address. Codes are drawn from the OS CSPRNG as six
/// independent uniform digits (repeats allowed), expire 15 minutes
/// after issuance, and are consumed on first successful use. A user
/// may accumulate several tokens (resends); each code is checked on
/// its own.
///
/// Expiry is evaluated lazily at verification time. There is no
/// background sweep; stale rows are simply never matched again.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activation_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     code VARCHAR(6) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL,
///     validated_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// How long an activation code stays valid
pub const TOKEN_TTL_MINUTES: i64 = 15;

/// Number of digits in an activation code
pub const CODE_LENGTH: usize = 6;

/// Activation token row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivationToken {
    /// Unique token ID
    pub id: Uuid,

    /// The user this token activates
    pub user_id: Uuid,

    /// The 6-digit code
    pub code: String,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// When the token stops being valid (issued + 15 minutes)
    pub expires_at: DateTime<Utc>,

    /// When the token was consumed (None while unused)
    pub validated_at: Option<DateTime<Utc>>,
}

impl ActivationToken {
    /// Whether the token has expired as of `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Generates a 6-digit activation code from the OS CSPRNG
///
/// Each digit is an independent uniform draw from 0–9, so repeated
/// digits are expected and fine.
pub fn generate_code() -> String {
    let mut rng = OsRng;
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

impl ActivationToken {
    /// Issues a fresh activation token for a user
    ///
    /// Generates a new code and persists it with a 15-minute expiry.
    /// Previously issued tokens are left untouched; the newest valid
    /// code is simply another row that matches.
    ///
    /// # Returns
    ///
    /// The persisted token, including the code to deliver.
    pub async fn issue(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES);

        let token = sqlx::query_as::<_, ActivationToken>(
            r#"
            INSERT INTO activation_tokens (user_id, code, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, code, created_at, expires_at, validated_at
            "#,
        )
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    /// Finds the most recently issued unconsumed token with this code
    ///
    /// Consumed tokens never match: a replayed code reads as unknown,
    /// not as expired.
    pub async fn find_unconsumed_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, ActivationToken>(
            r#"
            SELECT id, user_id, code, created_at, expires_at, validated_at
            FROM activation_tokens
            WHERE code = $1 AND validated_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Marks the token consumed
    pub async fn consume(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE activation_tokens
            SET validated_at = NOW()
            WHERE id = $1 AND validated_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
