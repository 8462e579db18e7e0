/// Role model and the closed role set
///
/// Roles are a small, closed enumeration seeded by migration rather
/// than an open string column. Registration resolves the default
/// role by name; a missing row is a fatal configuration error, not a
/// user-facing validation failure.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('user', 'admin');
///
/// CREATE TABLE roles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name user_role NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE user_roles (
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
///     PRIMARY KEY (user_id, role_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Closed set of roles a user may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    /// Default role assigned at registration
    User,

    /// Operator role
    Admin,
}

impl RoleName {
    /// Converts the role to its database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::User => "user",
            RoleName::Admin => "admin",
        }
    }
}

/// Role row from the seeded `roles` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    /// Unique role ID
    pub id: Uuid,

    /// Role name
    pub name: RoleName,

    /// When the role was seeded
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Finds a role by name
    ///
    /// Returns None when the role was never seeded; callers treat a
    /// missing default role as fatal configuration.
    pub async fn find_by_name(pool: &PgPool, name: RoleName) -> Result<Option<Self>, sqlx::Error> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, created_at
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Attaches this role to a user
    ///
    /// Idempotent: re-assigning an already-held role is a no-op.
    pub async fn assign_to_user(&self, pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(self.id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Lists the roles held by a user
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<RoleName>, sqlx::Error> {
        let roles: Vec<(RoleName,)> = sqlx::query_as(
            r#"
            SELECT r.name
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(roles.into_iter().map(|(name,)| name).collect())
    }
}
