/// Combined account and profile updates
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{self, IdentityStore, IdentityTx};
use crate::error::{IdentityError, Result};
use crate::models::{AccountChanges, AccountId, AccountPatch, IdentityRecord, ProfilePatch};
use crate::security::PasswordHasher;
use crate::validators;

/// Applies an account patch and a profile patch in one transaction
pub struct UpdateMerger<S> {
    store: Arc<S>,
    hasher: PasswordHasher,
}

impl<S: IdentityStore> UpdateMerger<S> {
    pub fn new(store: Arc<S>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Update a client's account and profile together
    ///
    /// The profile statement runs first. Every profile key present in the
    /// patch is written, an explicit null or blank value clears the column.
    /// Account keys are written only when supplied; a password that is blank
    /// after trimming leaves the stored hash alone. When no account key is
    /// supplied the account statement is skipped entirely.
    ///
    /// ## Errors
    ///
    /// - `ProfileNotFound` if the account has no profile; nothing is written
    /// - `EmailAlreadyExists` if the new email belongs to another account
    /// - `Transaction` if any statement fails; nothing is written
    pub async fn update_account_and_profile(
        &self,
        account_id: AccountId,
        account: AccountPatch,
        profile: ProfilePatch,
    ) -> Result<IdentityRecord> {
        validators::validate_account_patch(&account)?;
        let changes = self.account_changes(&account)?;

        let mut tx = self.store.begin().await?;
        let outcome = apply_updates(&mut tx, account_id, &changes, &profile).await;
        let record = db::finish(tx, outcome).await?;

        info!(
            account_id = %account_id,
            account_updated = !changes.is_empty(),
            password_changed = changes.password_hash.is_some(),
            "Updated account and profile"
        );
        Ok(record)
    }

    /// Translate a patch into a column diff, hashing a supplied password
    fn account_changes(&self, patch: &AccountPatch) -> Result<AccountChanges> {
        let trimmed = |v: &Option<String>| v.as_deref().map(|s| s.trim().to_string());

        let password_hash = match patch.password.as_deref() {
            Some(password) if !password.trim().is_empty() => Some(self.hasher.hash(password)?),
            _ => None,
        };

        Ok(AccountChanges {
            name: trimmed(&patch.name),
            surname: trimmed(&patch.surname),
            email: trimmed(&patch.email),
            phone: trimmed(&patch.phone),
            password_hash,
            role: patch.role,
        })
    }
}

async fn apply_updates<X: IdentityTx>(
    tx: &mut X,
    account_id: AccountId,
    changes: &AccountChanges,
    profile: &ProfilePatch,
) -> Result<IdentityRecord> {
    if tx.update_profile(account_id, profile).await? == 0 {
        return Err(IdentityError::ProfileNotFound);
    }

    if changes.is_empty() {
        debug!(account_id = %account_id, "No account changes, skipping account update");
    } else if tx.update_account(account_id, changes).await? == 0 {
        return Err(IdentityError::AccountNotFound);
    }

    tx.fetch_combined(account_id)
        .await?
        .ok_or(IdentityError::ProfileNotFound)
}
