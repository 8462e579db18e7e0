/// Application state and router builder
///
/// This module defines the shared application state and provides a
/// function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use bookrelay_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = bookrelay_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, mail::Mailer, storage::CoverStore};
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use bookrelay_shared::auth::middleware;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Upper bound on cover upload size (5 MB)
const MAX_COVER_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound mail delivery
    pub mailer: Mailer,

    /// Cover asset store
    pub covers: CoverStore,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        let mailer = Mailer::new(config.mail.clone());
        let covers = CoverStore::new(&config.covers.dir);
        Self {
            db,
            config: Arc::new(config),
            mailer,
            covers,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// ├── /v1/
/// │   ├── /auth/                       # Public
/// │   │   ├── POST /register
/// │   │   ├── POST /activate
/// │   │   ├── POST /login
/// │   │   └── POST /refresh
/// │   ├── /books/                      # JWT-protected
/// │   │   ├── POST   /
/// │   │   ├── GET    /                 # Displayable listing
/// │   │   ├── GET    /owned
/// │   │   ├── GET    /borrowed
/// │   │   ├── GET    /returned
/// │   │   ├── GET    /:id
/// │   │   ├── PATCH  /:id/shareable
/// │   │   ├── PATCH  /:id/archived
/// │   │   ├── POST   /:id/cover
/// │   │   ├── GET    /:id/cover
/// │   │   ├── POST   /:id/borrow
/// │   │   ├── PATCH  /:id/return
/// │   │   └── PATCH  /:id/return/approve
/// │   └── /feedbacks/                  # JWT-protected
/// │       ├── POST /
/// │       └── GET  /book/:book_id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route-group basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/activate", post(routes::auth::activate))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Book routes (require JWT authentication)
    let book_routes = Router::new()
        .route("/", post(routes::books::create_book))
        .route("/", get(routes::books::list_displayable))
        .route("/owned", get(routes::books::list_owned))
        .route("/borrowed", get(routes::books::list_borrowed))
        .route("/returned", get(routes::books::list_returned))
        .route("/:id", get(routes::books::get_book))
        .route("/:id/shareable", patch(routes::books::set_shareable))
        .route("/:id/archived", patch(routes::books::set_archived))
        .route("/:id/cover", post(routes::books::upload_cover))
        .route("/:id/cover", get(routes::books::read_cover))
        .route("/:id/borrow", post(routes::books::borrow_book))
        .route("/:id/return", patch(routes::books::return_book))
        .route("/:id/return/approve", patch(routes::books::approve_return))
        .layer(DefaultBodyLimit::max(MAX_COVER_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Feedback routes (require JWT authentication)
    let feedback_routes = Router::new()
        .route("/", post(routes::feedback::submit_feedback))
        .route("/book/:book_id", get(routes::feedback::list_feedback))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/books", book_routes)
        .nest("/feedbacks", feedback_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Delegates token extraction and validation to the shared middleware
/// and maps its errors into the API's JSON error envelope.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    middleware::jwt_auth_middleware(state.jwt_secret().to_string(), req, next)
        .await
        .map_err(Into::into)
}
