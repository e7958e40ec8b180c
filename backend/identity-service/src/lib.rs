/// Rental Identity Service Library
///
/// Account and rental profile management for the car rental backend:
/// provisioning, combined updates, identity resolution and login with the
/// reservation readiness gate.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Identity store seam and its PostgreSQL implementation
/// - `domain`: Login state machine and reservation readiness
/// - `error`: Error types
/// - `models`: Data models
/// - `security`: Password hashing, session tokens
/// - `services`: Business logic (resolver, provisioning, updates, authentication)
/// - `validators`: Input validation
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

// Re-export commonly used types
pub use error::{IdentityError, Result};
pub use services::IdentityServices;
