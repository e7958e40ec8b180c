/// Authentication service - credential checks, session tokens and the
/// reservation readiness gate
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::AccountResolver;
use crate::db::IdentityStore;
use crate::domain::{LoginState, Readiness};
use crate::error::{IdentityError, Result};
use crate::models::{Account, AccountId, IdentityRef, RequiredProfileField, Resolution, Role};
use crate::security::{PasswordHasher, SessionClaims, SessionTokenIssuer};

/// Caller context of a login attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthContext {
    /// Login was triggered from a booking flow
    pub is_reservation_flow: bool,
}

/// Outcome of a successful login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub account: Account,
    pub role: Role,
    pub token: String,
    pub profile_complete: bool,
    pub missing_fields: Vec<RequiredProfileField>,
    pub state: LoginState,
    pub reservation_flow: bool,
}

impl AuthResult {
    /// The caller wanted to book but the profile is incomplete
    pub fn booking_blocked(&self) -> bool {
        self.reservation_flow && !self.profile_complete
    }

    pub fn readiness(&self) -> Readiness {
        Readiness {
            profile_complete: self.profile_complete,
            missing_fields: self.missing_fields.clone(),
        }
    }
}

pub struct AuthenticationService<S> {
    store: Arc<S>,
    resolver: AccountResolver<S>,
    hasher: PasswordHasher,
    tokens: SessionTokenIssuer,
}

impl<S: IdentityStore> AuthenticationService<S> {
    pub fn new(store: Arc<S>, hasher: PasswordHasher, tokens: SessionTokenIssuer) -> Self {
        Self {
            resolver: AccountResolver::new(Arc::clone(&store)),
            store,
            hasher,
            tokens,
        }
    }

    /// Authenticate with email and password
    ///
    /// ## Returns
    ///
    /// The hash-free account, its derived role, a signed session token and
    /// the reservation readiness of the account.
    ///
    /// ## Errors
    ///
    /// `InvalidCredentials` for an unknown email and for a wrong password
    /// alike, so callers cannot probe which emails are registered.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        context: AuthContext,
    ) -> Result<AuthResult> {
        let state = LoginState::default().begin()?;

        let Some(credentials) = self.store.find_credentials_by_email(email.trim()).await? else {
            warn!("Login failed: unknown email");
            state.fail()?;
            return Err(IdentityError::InvalidCredentials);
        };

        let verified = match self.hasher.verify(password, &credentials.password_hash) {
            Ok(verified) => verified,
            Err(e) => {
                error!(
                    account_id = %credentials.account.id,
                    error = %e,
                    "Stored password hash is unusable"
                );
                false
            }
        };
        if !verified {
            warn!(account_id = %credentials.account.id, "Login failed: wrong password");
            state.fail()?;
            return Err(IdentityError::InvalidCredentials);
        }

        let account = credentials.account;
        let role = account.role();
        let token = self.tokens.issue(account.id, &account.email, role)?;

        let readiness = self.readiness_of(&account, role).await?;
        let state = state.settle(&readiness)?;

        let result = AuthResult {
            account,
            role,
            token,
            profile_complete: readiness.profile_complete,
            missing_fields: readiness.missing_fields,
            state,
            reservation_flow: context.is_reservation_flow,
        };

        if result.booking_blocked() {
            info!(
                account_id = %result.account.id,
                missing = ?result.missing_fields,
                "Booking blocked until profile is complete"
            );
        }
        info!(
            account_id = %result.account.id,
            role = %role,
            profile_complete = result.profile_complete,
            "User authenticated"
        );

        Ok(result)
    }

    /// Validate a session token issued by [`AuthenticationService::authenticate`]
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims> {
        self.tokens.validate(token)
    }

    /// Recompute the booking gate, e.g. after a profile edit
    pub async fn reservation_readiness(&self, account_id: AccountId) -> Result<Readiness> {
        match self.resolver.resolve(IdentityRef::Account(account_id)).await? {
            Resolution::Combined(record) => Ok(Readiness::for_account(
                record.account.role(),
                Some(&record.profile),
            )),
            Resolution::AccountOnly { account } => Ok(Readiness::for_account(account.role(), None)),
            Resolution::NotFound => Err(IdentityError::AccountNotFound),
        }
    }

    async fn readiness_of(&self, account: &Account, role: Role) -> Result<Readiness> {
        if role.is_staff() {
            return Ok(Readiness::complete());
        }
        let resolution = self.resolver.resolve(IdentityRef::Account(account.id)).await?;
        Ok(Readiness::for_account(role, resolution.profile()))
    }
}
