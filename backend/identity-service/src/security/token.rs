/// Signed session tokens (HS256)
///
/// Tokens carry the account id, email and role. They are signed with a
/// server-side secret and validated for signature, issuer and expiry; a
/// client cannot alter any claim without invalidating the token.
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, Result};
use crate::models::{AccountId, Role};

/// Minimum HMAC secret length (256 bits)
pub const MIN_SECRET_LENGTH: usize = 32;

const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Session token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (account id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    pub email: String,
    pub role: Role,
}

impl SessionClaims {
    pub fn account_id(&self) -> Result<AccountId> {
        self.sub
            .parse::<i64>()
            .map(AccountId)
            .map_err(|_| IdentityError::InvalidToken)
    }
}

/// Issues and validates session tokens with a shared secret
#[derive(Clone)]
pub struct SessionTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl SessionTokenIssuer {
    /// Build an issuer from an HMAC secret
    ///
    /// ## Errors
    ///
    /// Returns `IdentityError::Validation` when the secret is shorter than
    /// [`MIN_SECRET_LENGTH`] bytes or the TTL is not positive.
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_seconds: i64) -> Result<Self> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(IdentityError::Validation(format!(
                "JWT secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if ttl_seconds <= 0 {
            return Err(IdentityError::Validation(
                "Token lifetime must be positive".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            ttl: Duration::seconds(ttl_seconds),
        })
    }

    pub fn issue(&self, account_id: AccountId, email: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            iss: self.issuer.clone(),
            email: email.to_string(),
            role,
        };

        let token = encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) const TEST_SECRET: &str = "test-secret-key-with-at-least-32-bytes!!";
