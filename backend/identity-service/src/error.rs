use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Unique constraint guarding `utilisateurs.email`
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "utilisateurs_email_key";

/// Unique constraint guarding one profile per account
pub const PROFILE_ACCOUNT_UNIQUE_CONSTRAINT: &str = "client_utilisateur_id_key";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Profile already exists for this account")]
    ProfileAlreadyExists,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Coarse error classes handed to the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    InvalidCredentials,
    Transaction,
    Internal,
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Validation(_) | IdentityError::WeakPassword(_) => ErrorKind::Validation,
            IdentityError::EmailAlreadyExists | IdentityError::ProfileAlreadyExists => {
                ErrorKind::Conflict
            }
            IdentityError::AccountNotFound | IdentityError::ProfileNotFound => ErrorKind::NotFound,
            IdentityError::InvalidCredentials => ErrorKind::InvalidCredentials,
            IdentityError::Transaction(_) => ErrorKind::Transaction,
            IdentityError::InvalidToken
            | IdentityError::TokenExpired
            | IdentityError::Database(_)
            | IdentityError::JwtError(_)
            | IdentityError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show to end users
    pub fn public_message(&self) -> String {
        match self {
            IdentityError::Transaction(_)
            | IdentityError::Database(_)
            | IdentityError::JwtError(_)
            | IdentityError::Internal(_) => {
                // Don't leak internal details in production
                "Internal server error".to_string()
            }
            IdentityError::InvalidToken | IdentityError::TokenExpired => {
                "Invalid or expired token".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Rewrap store failures that happened after a transaction was opened
    pub(crate) fn into_transaction(self) -> Self {
        match self {
            IdentityError::Database(msg) => IdentityError::Transaction(msg),
            other => other,
        }
    }
}

// Conversions from external error types
impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => IdentityError::AccountNotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                match db_err.constraint() {
                    Some(PROFILE_ACCOUNT_UNIQUE_CONSTRAINT) => IdentityError::ProfileAlreadyExists,
                    Some(EMAIL_UNIQUE_CONSTRAINT) => IdentityError::EmailAlreadyExists,
                    _ => {
                        tracing::error!("Unexpected unique violation: {}", err);
                        IdentityError::Database(err.to_string())
                    }
                }
            }
            _ => {
                tracing::error!("Database error: {}", err);
                IdentityError::Database(err.to_string())
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind as JwtKind;

        match err.kind() {
            JwtKind::ExpiredSignature => IdentityError::TokenExpired,
            JwtKind::InvalidToken
            | JwtKind::InvalidSignature
            | JwtKind::InvalidIssuer
            | JwtKind::InvalidAlgorithm
            | JwtKind::ImmatureSignature
            | JwtKind::MissingRequiredClaim(_)
            | JwtKind::Base64(_)
            | JwtKind::Json(_)
            | JwtKind::Utf8(_) => IdentityError::InvalidToken,
            _ => {
                tracing::error!("JWT error: {}", err);
                IdentityError::JwtError(err.to_string())
            }
        }
    }
}

impl From<argon2::password_hash::Error> for IdentityError {
    fn from(err: argon2::password_hash::Error) -> Self {
        IdentityError::Internal(format!("Password hashing failed: {}", err))
    }
}
