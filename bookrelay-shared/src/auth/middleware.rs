/// Authentication middleware for Axum
///
/// Validates Bearer tokens from the Authorization header and adds an
/// [`AuthContext`] to the request extensions for handlers to extract.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware, Extension};
/// use bookrelay_shared::auth::middleware::{jwt_auth_middleware, AuthContext};
///
/// async fn protected_handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let secret = "your-jwt-secret".to_string();
/// let app: Router = Router::new()
///     .route("/protected", get(protected_handler))
///     .layer(middleware::from_fn(move |req, next| {
///         jwt_auth_middleware(secret.clone(), req, next)
///     }));
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Authentication context added to request extensions
///
/// Added to the request after successful token validation. Handlers
/// extract it with Axum's `Extension` extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Display name carried in the token
    pub full_name: String,
}

impl AuthContext {
    /// Creates auth context from validated JWT claims
    pub fn from_jwt(user_id: Uuid, full_name: String) -> Self {
        Self { user_id, full_name }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
        }
    }
}

/// JWT authentication middleware
///
/// Validates JWT tokens from the `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - Authorization header is missing
/// - Token validation fails
/// - Token has expired
///
/// Returns 400 Bad Request if the header is not a Bearer token.
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let auth_context = AuthContext::from_jwt(claims.sub, claims.full_name);
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_context_from_jwt() {
        let user_id = Uuid::new_v4();

        let context = AuthContext::from_jwt(user_id, "Ada Lovelace".to_string());

        assert_eq!(context.user_id, user_id);
        assert_eq!(context.full_name, "Ada Lovelace");
    }

    #[test]
    fn test_auth_error_into_response() {
        let err = AuthError::MissingCredentials;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let err = AuthError::InvalidFormat("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err = AuthError::InvalidToken("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
