//! # BookRelay API Server Library
//!
//! This library provides the core functionality for the BookRelay API
//! server: a shared book-library service where members list books,
//! borrow from each other, and leave feedback.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `mail`: Outbound activation mail delivery
//! - `storage`: Cover asset store
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod mail;
pub mod routes;
pub mod storage;
