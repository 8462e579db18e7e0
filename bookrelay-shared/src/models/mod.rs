/// Database models for BookRelay
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts and credential state
/// - `role`: Closed role set with seeded lookup
/// - `book`: Catalog entries with ownership and visibility flags
/// - `loan`: The borrow/return/approve lending ledger
/// - `feedback`: Per-book reviews and the derived rating
/// - `activation_token`: Time-boxed account activation codes
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
/// let new_user = CreateUser {
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod activation_token;
pub mod book;
pub mod feedback;
pub mod loan;
pub mod role;
pub mod user;
