/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, activate, login, refresh)
/// - `books`: Catalog, lending lifecycle, and cover endpoints
/// - `feedback`: Feedback submission and listing

pub mod health;
pub mod auth;
pub mod books;
pub mod feedback;
