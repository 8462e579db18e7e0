//! # BookRelay Shared Library
//!
//! This crate contains the types and business rules shared by the
//! BookRelay API server: database models, authentication primitives,
//! and the lending authorization rules.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication, token handling, and lending rules
//! - `db`: Connection pool and migration runner
//! - `pagination`: Page envelope shared by all listing endpoints

pub mod auth;
pub mod db;
pub mod models;
pub mod pagination;

/// Current version of the BookRelay shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
