/// In-memory identity store for tests
///
/// Transactions work on a snapshot of the tables. On commit the rows the
/// transaction touched are merged into the shared tables and the unique and
/// foreign key constraints are checked against the result, so overlapping
/// transactions behave like they do on PostgreSQL. Ids come from shared
/// sequences that never roll back. Every write statement is appended to a
/// log, and any statement kind can be made to fail to exercise rollback paths.
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{AccountInsert, IdentityStore, IdentityTx};
use crate::error::{IdentityError, Result};
use crate::models::{
    Account, AccountChanges, AccountCredentials, AccountId, IdentityRecord, Profile,
    ProfileFields, ProfileId, ProfilePatch,
};

/// Statement kinds recorded by the memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    InsertAccount,
    InsertProfile,
    UpdateProfile,
    UpdateAccount,
    DeleteProfile,
    DeleteAccount,
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: BTreeMap<AccountId, AccountCredentials>,
    profiles: BTreeMap<ProfileId, Profile>,
}

impl Tables {
    fn profile_of(&self, account_id: AccountId) -> Option<&Profile> {
        self.profiles.values().find(|p| p.account_id == account_id)
    }

    fn combined_by_account(&self, account_id: AccountId) -> Option<IdentityRecord> {
        let profile = self.profile_of(account_id)?.clone();
        let account = self.accounts.get(&account_id)?.account.clone();
        Some(IdentityRecord { account, profile })
    }

    fn email_taken(&self, email: &str, except: Option<AccountId>) -> bool {
        self.accounts
            .values()
            .any(|c| c.account.email == email && Some(c.account.id) != except)
    }

    /// Current tables with the touched rows of a transaction applied
    fn merged(
        &self,
        staged: &Tables,
        accounts: &HashSet<AccountId>,
        profiles: &HashSet<ProfileId>,
    ) -> Result<Tables> {
        let mut merged = self.clone();
        for id in accounts {
            match staged.accounts.get(id) {
                Some(row) => merged.accounts.insert(*id, row.clone()),
                None => merged.accounts.remove(id),
            };
        }
        for id in profiles {
            match staged.profiles.get(id) {
                Some(row) => merged.profiles.insert(*id, row.clone()),
                None => merged.profiles.remove(id),
            };
        }
        merged.check_constraints()?;
        Ok(merged)
    }

    fn check_constraints(&self) -> Result<()> {
        let mut emails = HashSet::new();
        for stored in self.accounts.values() {
            if !emails.insert(stored.account.email.as_str()) {
                return Err(IdentityError::EmailAlreadyExists);
            }
        }

        let mut owners = HashSet::new();
        for profile in self.profiles.values() {
            if !self.accounts.contains_key(&profile.account_id) {
                return Err(IdentityError::Database(
                    "client violates foreign key constraint on utilisateurs".to_string(),
                ));
            }
            if !owners.insert(profile.account_id) {
                return Err(IdentityError::ProfileAlreadyExists);
            }
        }
        Ok(())
    }
}

fn next_id(sequence: &AtomicI64) -> i64 {
    sequence.fetch_add(1, Ordering::SeqCst) + 1
}

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    failures: Mutex<HashSet<Statement>>,
    log: Mutex<Vec<Statement>>,
    account_sequence: AtomicI64,
    profile_sequence: AtomicI64,
}

#[derive(Clone, Default)]
pub struct MemoryIdentityStore {
    shared: Arc<Shared>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later statement of this kind fail
    pub async fn fail_on(&self, statement: Statement) {
        self.shared.failures.lock().await.insert(statement);
    }

    pub async fn clear_failures(&self) {
        self.shared.failures.lock().await.clear();
    }

    /// Statements issued so far, in order
    pub async fn statements(&self) -> Vec<Statement> {
        self.shared.log.lock().await.clone()
    }

    pub async fn clear_statements(&self) {
        self.shared.log.lock().await.clear();
    }

    pub async fn account_count(&self) -> usize {
        self.shared.tables.lock().await.accounts.len()
    }

    pub async fn profile_count(&self) -> usize {
        self.shared.tables.lock().await.profiles.len()
    }

    /// Stored password hash, for asserting credential safety
    pub async fn password_hash_of(&self, account_id: AccountId) -> Option<String> {
        self.shared
            .tables
            .lock()
            .await
            .accounts
            .get(&account_id)
            .map(|c| c.password_hash.clone())
    }

    /// Insert a row as a legacy writer would, with free-text role
    pub async fn seed_legacy_account(
        &self,
        email: &str,
        password_hash: &str,
        role_text: &str,
    ) -> AccountId {
        let mut tables = self.shared.tables.lock().await;
        let id = AccountId(next_id(&self.shared.account_sequence));
        let now = Utc::now();
        let account = Account {
            id,
            name: "Legacy".to_string(),
            surname: "Account".to_string(),
            email: email.to_string(),
            phone: String::new(),
            role: role_text.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(
            id,
            AccountCredentials {
                account,
                password_hash: password_hash.to_string(),
            },
        );
        id
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    type Tx = MemoryIdentityTx;

    async fn begin(&self) -> Result<MemoryIdentityTx> {
        let staged = self.shared.tables.lock().await.clone();
        let failures = self.shared.failures.lock().await.clone();
        Ok(MemoryIdentityTx {
            store: self.clone(),
            staged,
            failures,
            touched_accounts: HashSet::new(),
            touched_profiles: HashSet::new(),
        })
    }

    async fn find_combined_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<IdentityRecord>> {
        Ok(self.shared.tables.lock().await.combined_by_account(account_id))
    }

    async fn find_combined_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<IdentityRecord>> {
        let tables = self.shared.tables.lock().await;
        let record = tables.profiles.get(&profile_id).and_then(|profile| {
            tables.accounts.get(&profile.account_id).map(|c| IdentityRecord {
                account: c.account.clone(),
                profile: profile.clone(),
            })
        });
        Ok(record)
    }

    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        let tables = self.shared.tables.lock().await;
        Ok(tables.accounts.get(&account_id).map(|c| c.account.clone()))
    }

    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<AccountCredentials>> {
        let tables = self.shared.tables.lock().await;
        Ok(tables
            .accounts
            .values()
            .find(|c| c.account.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.shared.tables.lock().await.email_taken(email, None))
    }
}

pub struct MemoryIdentityTx {
    store: MemoryIdentityStore,
    staged: Tables,
    failures: HashSet<Statement>,
    touched_accounts: HashSet<AccountId>,
    touched_profiles: HashSet<ProfileId>,
}

impl MemoryIdentityTx {
    async fn record(&self, statement: Statement) -> Result<()> {
        self.store.shared.log.lock().await.push(statement);
        if self.failures.contains(&statement) {
            return Err(IdentityError::Database(format!(
                "injected failure on {:?}",
                statement
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityTx for MemoryIdentityTx {
    async fn insert_account(&mut self, insert: &AccountInsert) -> Result<Account> {
        self.record(Statement::InsertAccount).await?;
        if self.staged.email_taken(&insert.email, None) {
            return Err(IdentityError::EmailAlreadyExists);
        }

        let id = AccountId(next_id(&self.store.shared.account_sequence));
        let now = Utc::now();
        let account = Account {
            id,
            name: insert.name.clone(),
            surname: insert.surname.clone(),
            email: insert.email.clone(),
            phone: insert.phone.clone(),
            role: insert.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.staged.accounts.insert(
            id,
            AccountCredentials {
                account: account.clone(),
                password_hash: insert.password_hash.clone(),
            },
        );
        self.touched_accounts.insert(id);
        Ok(account)
    }

    async fn insert_profile(
        &mut self,
        account_id: AccountId,
        fields: &ProfileFields,
    ) -> Result<Profile> {
        self.record(Statement::InsertProfile).await?;
        if !self.staged.accounts.contains_key(&account_id) {
            return Err(IdentityError::Database(
                "insert on client violates foreign key constraint".to_string(),
            ));
        }
        if self.staged.profile_of(account_id).is_some() {
            return Err(IdentityError::ProfileAlreadyExists);
        }

        let fields = fields.normalized();
        let profile = Profile {
            id: ProfileId(next_id(&self.store.shared.profile_sequence)),
            account_id,
            civility: fields.civility,
            id_document: fields.id_document,
            birth_date: fields.birth_date,
            license_number: fields.license_number,
            license_issue_date: fields.license_issue_date,
            address: fields.address,
        };
        self.staged.profiles.insert(profile.id, profile.clone());
        self.touched_profiles.insert(profile.id);
        Ok(profile)
    }

    async fn update_profile(&mut self, account_id: AccountId, patch: &ProfilePatch) -> Result<u64> {
        self.record(Statement::UpdateProfile).await?;
        let mut matched = 0;
        for profile in self.staged.profiles.values_mut() {
            if profile.account_id == account_id {
                patch.apply_to(profile);
                self.touched_profiles.insert(profile.id);
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn update_account(
        &mut self,
        account_id: AccountId,
        changes: &AccountChanges,
    ) -> Result<u64> {
        self.record(Statement::UpdateAccount).await?;
        if let Some(email) = &changes.email {
            if self.staged.email_taken(email, Some(account_id)) {
                return Err(IdentityError::EmailAlreadyExists);
            }
        }

        let Some(stored) = self.staged.accounts.get_mut(&account_id) else {
            return Ok(0);
        };
        if let Some(v) = &changes.name {
            stored.account.name = v.clone();
        }
        if let Some(v) = &changes.surname {
            stored.account.surname = v.clone();
        }
        if let Some(v) = &changes.email {
            stored.account.email = v.clone();
        }
        if let Some(v) = &changes.phone {
            stored.account.phone = v.clone();
        }
        if let Some(v) = &changes.password_hash {
            stored.password_hash = v.clone();
        }
        if let Some(role) = changes.role {
            stored.account.role = role.as_str().to_string();
        }
        stored.account.updated_at = Utc::now();
        self.touched_accounts.insert(account_id);
        Ok(1)
    }

    async fn delete_profile(&mut self, account_id: AccountId) -> Result<u64> {
        self.record(Statement::DeleteProfile).await?;
        let removed: Vec<ProfileId> = self
            .staged
            .profiles
            .values()
            .filter(|p| p.account_id == account_id)
            .map(|p| p.id)
            .collect();
        for id in &removed {
            self.staged.profiles.remove(id);
            self.touched_profiles.insert(*id);
        }
        Ok(removed.len() as u64)
    }

    async fn delete_account(&mut self, account_id: AccountId) -> Result<u64> {
        self.record(Statement::DeleteAccount).await?;
        if self.staged.profile_of(account_id).is_some() {
            return Err(IdentityError::Database(
                "delete on utilisateurs violates foreign key constraint".to_string(),
            ));
        }
        let removed = self.staged.accounts.remove(&account_id).is_some();
        if removed {
            self.touched_accounts.insert(account_id);
        }
        Ok(u64::from(removed))
    }

    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool> {
        Ok(self.staged.accounts.contains_key(&account_id))
    }

    async fn fetch_combined(&mut self, account_id: AccountId) -> Result<Option<IdentityRecord>> {
        Ok(self.staged.combined_by_account(account_id))
    }

    async fn commit(self) -> Result<()> {
        self.record(Statement::Commit).await?;
        let mut tables = self.store.shared.tables.lock().await;
        let merged = tables.merged(&self.staged, &self.touched_accounts, &self.touched_profiles)?;
        *tables = merged;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.record(Statement::Rollback).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::error::ErrorKind;
    use crate::models::Role;

    fn insert(email: &str) -> AccountInsert {
        AccountInsert {
            name: "Doe".to_string(),
            surname: "Jane".to_string(),
            email: email.to_string(),
            phone: String::new(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::Client,
        }
    }

    #[tokio::test]
    async fn test_overlapping_inserts_of_same_email_conflict_at_commit() {
        let store = MemoryIdentityStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        // Neither transaction sees the other's row before commit
        first.insert_account(&insert("dup@x.com")).await.unwrap();
        second.insert_account(&insert("dup@x.com")).await.unwrap();

        db::finish(first, Ok(())).await.unwrap();
        let err = db::finish(second, Ok(())).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_overlapping_commits_keep_each_others_rows() {
        let store = MemoryIdentityStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        let a = first.insert_account(&insert("a@x.com")).await.unwrap();
        let b = second.insert_account(&insert("b@x.com")).await.unwrap();
        let c = second.insert_account(&insert("c@x.com")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);

        first.commit().await.unwrap();
        second.commit().await.unwrap();

        assert_eq!(store.account_count().await, 3);
        assert!(store.find_account(a.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_overlapping_profile_inserts_for_same_account() {
        let store = MemoryIdentityStore::new();
        let mut setup = store.begin().await.unwrap();
        let account = setup.insert_account(&insert("jane@x.com")).await.unwrap();
        setup.commit().await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first
            .insert_profile(account.id, &ProfileFields::default())
            .await
            .unwrap();
        second
            .insert_profile(account.id, &ProfileFields::default())
            .await
            .unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, IdentityError::ProfileAlreadyExists));
        assert_eq!(store.profile_count().await, 1);
    }

    #[tokio::test]
    async fn test_rolled_back_ids_are_not_reused() {
        let store = MemoryIdentityStore::new();
        let mut aborted = store.begin().await.unwrap();
        let lost = aborted.insert_account(&insert("a@x.com")).await.unwrap();
        aborted.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let kept = tx.insert_account(&insert("a@x.com")).await.unwrap();
        tx.commit().await.unwrap();

        assert!(kept.id > lost.id);
        assert_eq!(store.account_count().await, 1);
    }
}
