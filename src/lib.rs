// Social graph backend: users, posts, comments, follows, direct messages and push notifications

// HTTP handlers and router
pub mod api;

// Shared application state wired from Config
pub mod app_state;

// Environment configuration
pub mod config;

// Storage, ids, sessions, request identity, push delivery
pub mod infrastructure;

// Documents and API views
pub mod models;

// Business services
pub mod services;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
