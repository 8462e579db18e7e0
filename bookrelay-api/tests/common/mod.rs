/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Test database setup and migrations
/// - Test user creation (already activated)
/// - JWT token generation
/// - Request/response helpers
///
/// Tests require a running PostgreSQL instance, configured through
/// `TEST_DATABASE_URL` (falling back to `DATABASE_URL`), and are
/// marked `#[ignore]` so the default test run stays hermetic.

use bookrelay_api::app::{build_router, AppState};
use bookrelay_api::config::{ApiConfig, Config, CoversConfig, DatabaseConfig, JwtConfig, MailConfig};
use bookrelay_shared::auth::jwt::{create_token, Claims, TokenType};
use bookrelay_shared::models::user::{CreateUser, User};
use sqlx::PgPool;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
}

impl TestContext {
    /// Creates a new test context against the test database
    pub async fn new() -> anyhow::Result<Self> {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| anyhow::anyhow!("TEST_DATABASE_URL or DATABASE_URL must be set"))?;

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url: database_url.clone(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: TEST_JWT_SECRET.to_string(),
            },
            mail: MailConfig {
                endpoint: None, // activation codes are logged, not sent
                from: "no-reply@bookrelay.test".to_string(),
            },
            covers: CoversConfig {
                dir: std::env::temp_dir()
                    .join(format!("bookrelay-covers-{}", Uuid::new_v4()))
                    .to_string_lossy()
                    .into_owned(),
            },
        };

        let db = PgPool::connect(&database_url).await?;

        // Path relative to the crate's Cargo.toml
        sqlx::migrate!("../bookrelay-shared/migrations").run(&db).await?;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext { db, app, config })
    }

    /// Creates an activated user ready to authenticate
    pub async fn create_activated_user(&self) -> anyhow::Result<User> {
        let user = User::create(
            &self.db,
            CreateUser {
                first_name: "Test".to_string(),
                last_name: format!("User{}", &Uuid::new_v4().to_string()[..8]),
                email: format!("test-{}@example.com", Uuid::new_v4()),
                // Not a real hash; tests authenticate with minted tokens
                password_hash: "test-hash".to_string(),
            },
        )
        .await?;

        User::confirm(&self.db, user.id).await?;

        Ok(user)
    }

    /// Mints an access token for a user
    pub fn token_for(&self, user: &User) -> anyhow::Result<String> {
        let claims = Claims::new(user.id, user.full_name(), TokenType::Access);
        Ok(create_token(&claims, &self.config.jwt.secret)?)
    }

    /// Returns an authorization header value for a user
    pub fn auth_header(&self, user: &User) -> anyhow::Result<String> {
        Ok(format!("Bearer {}", self.token_for(user)?))
    }
}

/// Sends a request through the router and returns (status, JSON body)
pub async fn send_json(
    app: &axum::Router,
    request: axum::http::Request<axum::body::Body>,
) -> anyhow::Result<(axum::http::StatusCode, serde_json::Value)> {
    use tower::ServiceExt;

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;

    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body)?
    };

    Ok((status, json))
}

/// Builds an authenticated JSON request
pub fn json_request(
    method: &str,
    uri: &str,
    auth: &str,
    body: Option<serde_json::Value>,
) -> axum::http::Request<axum::body::Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", auth)
        .header("content-type", "application/json");

    let body = match body {
        Some(json) => axum::body::Body::from(json.to_string()),
        None => axum::body::Body::empty(),
    };

    builder.body(body).expect("request should build")
}
