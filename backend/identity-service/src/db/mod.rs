/// Persistence for accounts (`utilisateurs`) and rental profiles (`client`)
///
/// The services only talk to the [`IdentityStore`] / [`IdentityTx`] seams:
///
/// - `postgres`: production store on a sqlx `PgPool`
/// - `memory`: in-memory store with fault injection for tests
use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Account, AccountChanges, AccountCredentials, AccountId, IdentityRecord, Profile,
    ProfileFields, ProfileId, ProfilePatch,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgIdentityStore;

/// Account insert with the password already hashed
#[derive(Clone)]
pub struct AccountInsert {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: crate::models::Role,
}

/// Read side of the identity store plus the transaction entry point
#[async_trait]
pub trait IdentityStore: Send + Sync {
    type Tx: IdentityTx;

    /// Open a transaction; it must end in `commit` or `rollback`
    async fn begin(&self) -> Result<Self::Tx>;

    /// Account joined with the profile whose `utilisateur_id` is `account_id`
    async fn find_combined_by_account(&self, account_id: AccountId)
        -> Result<Option<IdentityRecord>>;

    /// Account joined with the profile whose own id is `profile_id`
    async fn find_combined_by_profile(&self, profile_id: ProfileId)
        -> Result<Option<IdentityRecord>>;

    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>>;

    /// Exact email lookup, the only read that returns the password hash
    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<AccountCredentials>>;

    /// Advisory duplicate check, never authoritative
    async fn email_exists(&self, email: &str) -> Result<bool>;
}

/// Write statements issued inside one store transaction
#[async_trait]
pub trait IdentityTx: Send {
    async fn insert_account(&mut self, account: &AccountInsert) -> Result<Account>;

    async fn insert_profile(&mut self, account_id: AccountId, fields: &ProfileFields)
        -> Result<Profile>;

    /// Write every key present in the patch; returns the number of rows matched
    async fn update_profile(&mut self, account_id: AccountId, patch: &ProfilePatch)
        -> Result<u64>;

    /// Write the non-empty diff; returns the number of rows matched
    async fn update_account(&mut self, account_id: AccountId, changes: &AccountChanges)
        -> Result<u64>;

    async fn delete_profile(&mut self, account_id: AccountId) -> Result<u64>;

    async fn delete_account(&mut self, account_id: AccountId) -> Result<u64>;

    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool>;

    /// Read back the combined record as seen by this transaction
    async fn fetch_combined(&mut self, account_id: AccountId) -> Result<Option<IdentityRecord>>;

    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Single exit point for a transaction: commit on success, roll back on
/// the first failure and surface the originating error.
pub async fn finish<T, X>(tx: X, outcome: Result<T>) -> Result<T>
where
    X: IdentityTx,
{
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(|e| e.into_transaction())?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "Failed to roll back transaction");
            }
            Err(err.into_transaction())
        }
    }
}
