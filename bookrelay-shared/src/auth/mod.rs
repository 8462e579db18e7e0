/// Authentication and authorization utilities
///
/// This module provides the security primitives for BookRelay:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Axum middleware that turns a Bearer token into an
///   [`middleware::AuthContext`] request extension
/// - [`authorization`]: lending eligibility rules shared by the borrow
///   and feedback paths
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with access/refresh token types
/// - **Constant-time Comparison**: password verification uses the
///   constant-time path built into the argon2 crate
///
/// # Example
///
/// ```no_run
/// use bookrelay_shared::auth::password::{hash_password, verify_password};
/// use bookrelay_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), "Ada Lovelace", TokenType::Access);
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod middleware;
pub mod authorization;
