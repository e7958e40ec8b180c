/// Account and profile provisioning
///
/// Every operation that writes more than one row runs in a single store
/// transaction and ends in exactly one commit or rollback.
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{self, AccountInsert, IdentityStore, IdentityTx};
use crate::error::{IdentityError, Result};
use crate::models::{Account, AccountId, IdentityRecord, NewAccount, ProfileFields};
use crate::security::PasswordHasher;
use crate::validators;

pub struct ProvisioningService<S> {
    store: Arc<S>,
    hasher: PasswordHasher,
}

impl<S: IdentityStore> ProvisioningService<S> {
    pub fn new(store: Arc<S>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Create an account and its rental profile atomically
    ///
    /// ## Workflow
    ///
    /// 1. Validate account fields (name, surname, email, password)
    /// 2. Advisory email pre-check
    /// 3. Insert account, capture generated id
    /// 4. Insert profile referencing it
    /// 5. Commit, or roll back everything on the first failure
    ///
    /// ## Errors
    ///
    /// - `Validation` / `WeakPassword` before any store access
    /// - `EmailAlreadyExists` from the pre-check or the unique constraint
    pub async fn create_account_with_profile(
        &self,
        account: NewAccount,
        profile: ProfileFields,
    ) -> Result<IdentityRecord> {
        let insert = self.prepare(&account).await?;

        let mut tx = self.store.begin().await?;
        let outcome = insert_with_profile(&mut tx, &insert, &profile).await;
        let record = db::finish(tx, outcome).await.map_err(|e| {
            warn!(error = %e, "Account provisioning rolled back");
            e
        })?;

        info!(
            account_id = %record.account.id,
            profile_id = %record.profile.id,
            "Provisioned account with profile"
        );
        Ok(record)
    }

    /// Create an account without a rental profile
    pub async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let insert = self.prepare(&account).await?;

        let mut tx = self.store.begin().await?;
        let outcome = tx.insert_account(&insert).await;
        let created = db::finish(tx, outcome).await?;

        info!(account_id = %created.id, role = %insert.role, "Created account");
        Ok(created)
    }

    /// Create the rental profile of an existing account
    ///
    /// ## Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `ProfileAlreadyExists` if the account already has a profile
    pub async fn attach_profile(
        &self,
        account_id: AccountId,
        profile: ProfileFields,
    ) -> Result<IdentityRecord> {
        let mut tx = self.store.begin().await?;
        let outcome = attach_in_tx(&mut tx, account_id, &profile).await;
        let record = db::finish(tx, outcome).await?;

        info!(
            account_id = %account_id,
            profile_id = %record.profile.id,
            "Attached profile to account"
        );
        Ok(record)
    }

    /// Delete the profile, then the account, in one transaction
    ///
    /// A profile delete that matches no row aborts before the account delete
    /// is issued, so only accounts that own a profile can be removed here.
    /// Staff accounts, which have no profile, get `ProfileNotFound`.
    pub async fn delete_account_and_profile(&self, account_id: AccountId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let outcome = delete_in_tx(&mut tx, account_id).await;
        db::finish(tx, outcome).await?;

        info!(account_id = %account_id, "Deleted account and profile");
        Ok(())
    }

    /// Validate, normalise and hash before a transaction is opened
    async fn prepare(&self, account: &NewAccount) -> Result<AccountInsert> {
        validators::validate_new_account(account)?;

        let email = account.email.trim().to_string();
        if self.store.email_exists(&email).await? {
            // Fast path only; the unique constraint stays authoritative
            debug!("Email already registered (pre-check)");
            return Err(IdentityError::EmailAlreadyExists);
        }

        let password = account.password.as_deref().unwrap_or_default();
        Ok(AccountInsert {
            name: account.name.trim().to_string(),
            surname: account.surname.trim().to_string(),
            email,
            phone: account.phone.trim().to_string(),
            password_hash: self.hasher.hash(password)?,
            role: account.role.unwrap_or_default(),
        })
    }
}

async fn insert_with_profile<X: IdentityTx>(
    tx: &mut X,
    insert: &AccountInsert,
    profile: &ProfileFields,
) -> Result<IdentityRecord> {
    let account = tx.insert_account(insert).await?;
    let profile = tx.insert_profile(account.id, profile).await?;
    Ok(IdentityRecord { account, profile })
}

async fn attach_in_tx<X: IdentityTx>(
    tx: &mut X,
    account_id: AccountId,
    profile: &ProfileFields,
) -> Result<IdentityRecord> {
    if !tx.account_exists(account_id).await? {
        return Err(IdentityError::AccountNotFound);
    }
    tx.insert_profile(account_id, profile).await?;
    tx.fetch_combined(account_id)
        .await?
        .ok_or(IdentityError::ProfileNotFound)
}

async fn delete_in_tx<X: IdentityTx>(tx: &mut X, account_id: AccountId) -> Result<()> {
    if tx.delete_profile(account_id).await? == 0 {
        return Err(IdentityError::ProfileNotFound);
    }
    if tx.delete_account(account_id).await? == 0 {
        return Err(IdentityError::AccountNotFound);
    }
    Ok(())
}
