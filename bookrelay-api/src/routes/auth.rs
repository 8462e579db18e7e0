/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Registration (with mailed activation code)
/// - Account activation
/// - Login
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a new account
/// - `POST /v1/auth/activate` - Activate an account with a mailed code
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Json};
use bookrelay_shared::{
    auth::{jwt, password},
    models::{
        activation_token::ActivationToken,
        role::{Role, RoleName},
        user::{CreateUser, User},
    },
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// First name
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    /// Last name
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// New user ID
    pub user_id: String,
}

/// Activation request
#[derive(Debug, Deserialize, Validate)]
pub struct ActivateRequest {
    /// The 6-digit activation code from the email
    #[validate(length(equal = 6, message = "Activation code must be 6 digits"))]
    pub code: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// User ID
    pub user_id: String,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Maps validator errors into the API's validation error shape
fn validation_error(e: validator::ValidationErrors) -> ApiError {
    let errors: Vec<ValidationErrorDetail> = e
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(errors)
}

/// Register a new user
///
/// Creates a disabled-until-activated account, assigns the default
/// user role, and mails a 6-digit activation code.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "email": "ada@example.com",
///   "password": "SecurePass123"
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed
/// - `500 Internal Server Error`: Default role missing (seed migration
///   not applied)
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate().map_err(validation_error)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    // Roles are seeded by migration; a missing default role is a
    // deployment fault, not a client error.
    let role = Role::find_by_name(&state.db, RoleName::User)
        .await?
        .ok_or_else(|| ApiError::InternalError("Default user role is not seeded".to_string()))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    role.assign_to_user(&state.db, user.id).await?;

    let token = ActivationToken::issue(&state.db, user.id).await?;
    state
        .mailer
        .send_activation_code(&user.email, &user.full_name(), &token.code);

    tracing::info!(user_id = %user.id, "Registered new account, activation pending");

    Ok((
        StatusCode::ACCEPTED,
        Json(RegisterResponse {
            user_id: user.id.to_string(),
        }),
    ))
}

/// Activate an account with a mailed code
///
/// Looks up the newest unconsumed token matching the code. An unknown
/// or already consumed code is rejected outright. An expired code is
/// rejected too, but a fresh code is issued and mailed in the same
/// breath so the user can retry without re-registering.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/activate
/// Content-Type: application/json
///
/// { "code": "482913" }
/// ```
///
/// # Errors
///
/// - `400 activation_token_invalid`: Unknown or consumed code
/// - `400 activation_token_expired`: Expired code; a new one was sent
pub async fn activate(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> ApiResult<StatusCode> {
    req.validate().map_err(validation_error)?;

    let token = ActivationToken::find_unconsumed_by_code(&state.db, &req.code)
        .await?
        .ok_or(ApiError::TokenNotFound)?;

    if token.is_expired(Utc::now()) {
        let user = User::find_by_id(&state.db, token.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let fresh = ActivationToken::issue(&state.db, user.id).await?;
        state
            .mailer
            .send_activation_code(&user.email, &user.full_name(), &fresh.code);

        tracing::info!(user_id = %user.id, "Activation code expired, reissued");
        return Err(ApiError::TokenExpired);
    }

    User::confirm(&state.db, token.user_id).await?;
    ActivationToken::consume(&state.db, token.id).await?;

    tracing::info!(user_id = %token.user_id, "Account activated");

    Ok(StatusCode::OK)
}

/// Login endpoint
///
/// Authenticates a user and returns JWT tokens. Credential failure and
/// unknown email produce the same response, so the endpoint does not
/// leak which emails are registered. Account-state checks run after
/// the credential check for the same reason.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "SecurePass123"
/// }
/// ```
///
/// # Errors
///
/// - `401 bad_credentials`: Invalid email or password
/// - `403 account_locked` / `account_disabled` / `account_not_activated`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate().map_err(validation_error)?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or(ApiError::BadCredentials)?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::BadCredentials);
    }

    if user.account_locked {
        return Err(ApiError::AccountLocked);
    }
    if !user.enabled {
        return Err(ApiError::AccountDisabled);
    }
    if !user.confirmed {
        return Err(ApiError::AccountNotActivated);
    }

    User::update_last_login(&state.db, user.id).await?;

    let full_name = user.full_name();
    let access_claims = jwt::Claims::new(user.id, full_name.clone(), jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, full_name, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(Json(LoginResponse {
        user_id: user.id.to_string(),
        access_token,
        refresh_token,
    }))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}
