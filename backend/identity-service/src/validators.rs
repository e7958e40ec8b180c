use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{IdentityError, Result};
use crate::models::{AccountPatch, NewAccount};
use crate::security::password::MIN_PASSWORD_LENGTH;

/// Input validation utilities for identity service

// Compile regex patterns once at startup
// These patterns are hardcoded and always valid, so we use expect() with explicit reasoning
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    // This regex is hardcoded and validated - it is a compile-time constant in practice
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IdentityError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn require_email(email: &str) -> Result<()> {
    require("email", email)?;
    if !validate_email(email.trim()) {
        return Err(IdentityError::Validation(format!(
            "Invalid email: {}",
            email.trim()
        )));
    }
    Ok(())
}

/// Check a creation request before any store access
pub fn validate_new_account(account: &NewAccount) -> Result<()> {
    require("name", &account.name)?;
    require("surname", &account.surname)?;
    require_email(&account.email)?;

    let password = account.password.as_deref().unwrap_or_default();
    require("password", password)?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(IdentityError::WeakPassword(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(())
}

/// Check the keys present in an update request
pub fn validate_account_patch(patch: &AccountPatch) -> Result<()> {
    if let Some(name) = &patch.name {
        require("name", name)?;
    }
    if let Some(surname) = &patch.surname {
        require("surname", surname)?;
    }
    if let Some(email) = &patch.email {
        require_email(email)?;
    }
    Ok(())
}
