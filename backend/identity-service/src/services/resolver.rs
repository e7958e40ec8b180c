/// Identity resolution across the account and profile ID spaces
use std::sync::Arc;
use tracing::debug;

use crate::db::IdentityStore;
use crate::error::Result;
use crate::models::{AccountId, IdentityRef, ProfileId, Resolution};

/// Read-only resolver from an identifier to account and profile
pub struct AccountResolver<S> {
    store: Arc<S>,
}

impl<S> Clone for AccountResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: IdentityStore> AccountResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolve an identifier whose ID space is known
    pub async fn resolve(&self, identity: IdentityRef) -> Result<Resolution> {
        match identity {
            IdentityRef::Account(account_id) => {
                if let Some(record) = self.store.find_combined_by_account(account_id).await? {
                    return Ok(Resolution::Combined(record));
                }
                Ok(self
                    .store
                    .find_account(account_id)
                    .await?
                    .map_or(Resolution::NotFound, |account| Resolution::AccountOnly {
                        account,
                    }))
            }
            IdentityRef::Profile(profile_id) => Ok(self
                .store
                .find_combined_by_profile(profile_id)
                .await?
                .into()),
        }
    }

    /// Resolve an identifier of unknown ID space.
    ///
    /// First match wins:
    /// 1. a profile owned by account `raw`
    /// 2. the profile whose own id is `raw`
    /// 3. the account `raw` without a profile
    ///
    /// Ambiguous when both ID spaces contain `raw`; step 1 wins. Prefer
    /// [`AccountResolver::resolve`] wherever the caller knows the ID space.
    pub async fn resolve_untyped(&self, raw: i64) -> Result<Resolution> {
        if let Some(record) = self.store.find_combined_by_account(AccountId(raw)).await? {
            debug!(identifier = raw, "Resolved as account with profile");
            return Ok(Resolution::Combined(record));
        }

        if let Some(record) = self.store.find_combined_by_profile(ProfileId(raw)).await? {
            debug!(identifier = raw, account_id = %record.account.id, "Resolved as profile id");
            return Ok(Resolution::Combined(record));
        }

        if let Some(account) = self.store.find_account(AccountId(raw)).await? {
            debug!(identifier = raw, "Resolved as account without profile");
            return Ok(Resolution::AccountOnly { account });
        }

        debug!(identifier = raw, "Identifier not found");
        Ok(Resolution::NotFound)
    }
}
