//! Configuration management for the rental identity service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development)
//!
//! # Example
//!
//! ```no_run
//! use rental_identity_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("JWT issuer: {}", settings.jwt.issuer);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::security::token::MIN_SECRET_LENGTH;

/// Application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub password: PasswordSettings,
    pub bootstrap: Option<BootstrapSettings>,
}

impl Settings {
    /// Load settings from environment variables, plus `.env` in debug builds
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            password: PasswordSettings::from_env()?,
            bootstrap: BootstrapSettings::from_env()?,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset
fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10)?,
            min_connections: var_or("DATABASE_MIN_CONNECTIONS", 1)?,
            acquire_timeout: var_or("DATABASE_ACQUIRE_TIMEOUT", 5)?,
        })
    }
}

/// Session token settings
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub expiry_seconds: i64,
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.len() < MIN_SECRET_LENGTH {
            bail!(
                "JWT_SECRET must be at least {} bytes, got {}",
                MIN_SECRET_LENGTH,
                secret.len()
            );
        }

        Ok(Self {
            secret,
            issuer: env::var("JWT_ISSUER")
                .unwrap_or_else(|_| "rental-identity-service".to_string()),
            expiry_seconds: var_or("JWT_EXPIRY_SECONDS", 3600)?,
        })
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("expiry_seconds", &self.expiry_seconds)
            .finish()
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl PasswordSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            memory_kib: var_or("ARGON2_MEMORY_KIB", 19_456)?,
            iterations: var_or("ARGON2_ITERATIONS", 2)?,
            parallelism: var_or("ARGON2_PARALLELISM", 1)?,
        })
    }
}

/// Admin account created at startup when absent
#[derive(Clone)]
pub struct BootstrapSettings {
    pub admin_email: String,
    pub admin_password: String,
}

impl BootstrapSettings {
    /// Both variables or neither
    fn from_env() -> Result<Option<Self>> {
        match (
            env::var("BOOTSTRAP_ADMIN_EMAIL").ok(),
            env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
        ) {
            (Some(admin_email), Some(admin_password)) => Ok(Some(Self {
                admin_email,
                admin_password,
            })),
            (None, None) => Ok(None),
            _ => bail!("BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together"),
        }
    }
}

impl fmt::Debug for BootstrapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapSettings")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"[REDACTED]")
            .finish()
    }
}
