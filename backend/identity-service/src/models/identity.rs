use serde::{Deserialize, Serialize};

use super::{Account, AccountId, Profile, ProfileId};

/// Account joined with its rental profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub account: Account,
    pub profile: Profile,
}

/// Identifier tagged with the ID space it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum IdentityRef {
    Account(AccountId),
    Profile(ProfileId),
}

/// Outcome of an identity lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Resolution {
    Combined(IdentityRecord),
    AccountOnly { account: Account },
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn account(&self) -> Option<&Account> {
        match self {
            Resolution::Combined(record) => Some(&record.account),
            Resolution::AccountOnly { account } => Some(account),
            Resolution::NotFound => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Resolution::Combined(record) => Some(&record.profile),
            _ => None,
        }
    }
}

impl From<Option<IdentityRecord>> for Resolution {
    fn from(record: Option<IdentityRecord>) -> Self {
        record.map_or(Resolution::NotFound, Resolution::Combined)
    }
}
