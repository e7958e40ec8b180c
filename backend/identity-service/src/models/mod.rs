/// Data models for accounts, rental profiles and their combination
pub mod account;
pub mod identity;
pub mod profile;

pub use account::{
    Account, AccountChanges, AccountCredentials, AccountId, AccountPatch, NewAccount, Role,
};
pub use identity::{IdentityRecord, IdentityRef, Resolution};
pub use profile::{Profile, ProfileFields, ProfileId, ProfilePatch, RequiredProfileField};

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer};

/// Deserialize a key that may be absent, null, or set.
///
/// Absent keys stay `None` through `#[serde(default)]`; a present key (even
/// `null`) becomes `Some(..)`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Deserialize an optional `YYYY-MM-DD` date where `null`, `""` and
/// whitespace all mean "no date"
pub(crate) fn blank_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(de::Error::custom),
        _ => Ok(None),
    }
}

/// [`present`] for dates, with blank input clearing the column
pub(crate) fn present_date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_date(deserializer).map(Some)
}

/// Trim a text value and collapse blank input to NULL
pub(crate) fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
