/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP
/// responses. All handlers return `Result<T, ApiError>` which
/// automatically converts to the right HTTP status code plus a
/// machine-readable error code clients can branch on.
///
/// # Error Codes
///
/// | Variant                 | Status | Code                        |
/// |-------------------------|--------|-----------------------------|
/// | `BadRequest`            | 400    | `bad_request`               |
/// | `OperationNotPermitted` | 400    | `operation_not_permitted`   |
/// | `TokenExpired`          | 400    | `activation_token_expired`  |
/// | `TokenNotFound`         | 400    | `activation_token_invalid`  |
/// | `BadCredentials`        | 401    | `bad_credentials`           |
/// | `Unauthorized`          | 401    | `unauthorized`              |
/// | `AccountLocked`         | 403    | `account_locked`            |
/// | `AccountDisabled`       | 403    | `account_disabled`          |
/// | `AccountNotActivated`   | 403    | `account_not_activated`     |
/// | `NotFound`              | 404    | `not_found`                 |
/// | `Conflict`              | 409    | `conflict`                  |
/// | `ValidationError`       | 422    | `validation_error`          |
/// | `InternalError`         | 500    | `internal_error`            |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Business rule rejected the operation (400)
    OperationNotPermitted(String),

    /// Activation code expired; a fresh one was issued (400)
    TokenExpired,

    /// Activation code unknown or already consumed (400)
    TokenNotFound,

    /// Wrong email or password (401)
    BadCredentials,

    /// Missing or invalid authentication (401)
    Unauthorized(String),

    /// Account locked by an administrator (403)
    AccountLocked,

    /// Account disabled (403)
    AccountDisabled,

    /// Account exists but was never activated (403)
    AccountNotActivated,

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Unprocessable entity (422), validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::OperationNotPermitted(msg) => {
                write!(f, "Operation not permitted: {}", msg)
            }
            ApiError::TokenExpired => write!(f, "Activation token has expired"),
            ApiError::TokenNotFound => write!(f, "Activation token not found"),
            ApiError::BadCredentials => write!(f, "Invalid email or password"),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::AccountLocked => write!(f, "Account is locked"),
            ApiError::AccountDisabled => write!(f, "Account is disabled"),
            ApiError::AccountNotActivated => write!(f, "Account is not activated"),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::OperationNotPermitted(msg) => (
                StatusCode::BAD_REQUEST,
                "operation_not_permitted",
                msg,
                None,
            ),
            ApiError::TokenExpired => (
                StatusCode::BAD_REQUEST,
                "activation_token_expired",
                "Activation code expired. A new code has been sent to your email".to_string(),
                None,
            ),
            ApiError::TokenNotFound => (
                StatusCode::BAD_REQUEST,
                "activation_token_invalid",
                "Invalid activation code".to_string(),
                None,
            ),
            ApiError::BadCredentials => (
                StatusCode::UNAUTHORIZED,
                "bad_credentials",
                "Invalid email or password".to_string(),
                None,
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::AccountLocked => (
                StatusCode::FORBIDDEN,
                "account_locked",
                "Account is locked".to_string(),
                None,
            ),
            ApiError::AccountDisabled => (
                StatusCode::FORBIDDEN,
                "account_disabled",
                "Account is disabled".to_string(),
                None,
            ),
            ApiError::AccountNotActivated => (
                StatusCode::FORBIDDEN,
                "account_not_activated",
                "Account has not been activated".to_string(),
                None,
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict("Email already exists".to_string());
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert auth middleware errors to API errors
impl From<bookrelay_shared::auth::middleware::AuthError> for ApiError {
    fn from(err: bookrelay_shared::auth::middleware::AuthError) -> Self {
        use bookrelay_shared::auth::middleware::AuthError;
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

/// Convert lending rule errors to API errors
impl From<bookrelay_shared::auth::authorization::LendingError> for ApiError {
    fn from(err: bookrelay_shared::auth::authorization::LendingError) -> Self {
        ApiError::OperationNotPermitted(err.to_string())
    }
}

/// Convert password errors to API errors
impl From<bookrelay_shared::auth::password::PasswordError> for ApiError {
    fn from(err: bookrelay_shared::auth::password::PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<bookrelay_shared::auth::jwt::JwtError> for ApiError {
    fn from(err: bookrelay_shared::auth::jwt::JwtError) -> Self {
        use bookrelay_shared::auth::jwt::JwtError;
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookrelay_shared::auth::authorization::LendingError;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Book not found".to_string());
        assert_eq!(err.to_string(), "Not found: Book not found");

        let err = ApiError::TokenExpired;
        assert_eq!(err.to_string(), "Activation token has expired");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_lending_error_maps_to_operation_not_permitted() {
        let err: ApiError = LendingError::OwnBook.into();
        assert!(matches!(err, ApiError::OperationNotPermitted(_)));
    }

    #[test]
    fn test_status_codes() {
        let response = ApiError::TokenExpired.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::BadCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ApiError::AccountNotActivated.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ApiError::Conflict("dup".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
