/// Security module for authentication
///
/// Provides core security primitives for the identity service:
/// - Password hashing and verification (Argon2id)
/// - Signed session tokens (HS256 JWT)
pub mod password;
pub mod token;

pub use password::PasswordHasher;
pub use token::{SessionClaims, SessionTokenIssuer};
