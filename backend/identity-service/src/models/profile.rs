use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::{blank_date, normalize_text, present, present_date, AccountId};

/// Primary key of a `client` row
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ProfileId(pub i64);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rental profile attached to at most one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: ProfileId,
    pub account_id: AccountId,
    pub civility: Option<String>,
    pub id_document: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub license_number: Option<String>,
    pub license_issue_date: Option<NaiveDate>,
    pub address: Option<String>,
}

impl Profile {
    /// Whether a reservation-relevant field holds a usable value
    pub fn is_filled(&self, field: RequiredProfileField) -> bool {
        fn filled(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.trim().is_empty())
        }

        match field {
            RequiredProfileField::Civility => filled(&self.civility),
            RequiredProfileField::IdDocument => filled(&self.id_document),
            RequiredProfileField::BirthDate => self.birth_date.is_some(),
            RequiredProfileField::LicenseNumber => filled(&self.license_number),
            RequiredProfileField::LicenseIssueDate => self.license_issue_date.is_some(),
            RequiredProfileField::Address => filled(&self.address),
        }
    }
}

/// Fields required before a client may book, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequiredProfileField {
    Civility,
    IdDocument,
    BirthDate,
    LicenseNumber,
    LicenseIssueDate,
    Address,
}

impl RequiredProfileField {
    pub const ALL: [RequiredProfileField; 6] = [
        RequiredProfileField::Civility,
        RequiredProfileField::IdDocument,
        RequiredProfileField::BirthDate,
        RequiredProfileField::LicenseNumber,
        RequiredProfileField::LicenseIssueDate,
        RequiredProfileField::Address,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredProfileField::Civility => "civility",
            RequiredProfileField::IdDocument => "idDocument",
            RequiredProfileField::BirthDate => "birthDate",
            RequiredProfileField::LicenseNumber => "licenseNumber",
            RequiredProfileField::LicenseIssueDate => "licenseIssueDate",
            RequiredProfileField::Address => "address",
        }
    }
}

impl fmt::Display for RequiredProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile values supplied at creation; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileFields {
    pub civility: Option<String>,
    pub id_document: Option<String>,
    #[serde(deserialize_with = "blank_date")]
    pub birth_date: Option<NaiveDate>,
    pub license_number: Option<String>,
    #[serde(deserialize_with = "blank_date")]
    pub license_issue_date: Option<NaiveDate>,
    pub address: Option<String>,
}

impl ProfileFields {
    pub fn normalized(&self) -> Self {
        Self {
            civility: normalize_text(self.civility.as_deref()),
            id_document: normalize_text(self.id_document.as_deref()),
            birth_date: self.birth_date,
            license_number: normalize_text(self.license_number.as_deref()),
            license_issue_date: self.license_issue_date,
            address: normalize_text(self.address.as_deref()),
        }
    }
}

/// Profile update request.
///
/// Every key present in the patch replaces the stored column, including an
/// explicit `null` or blank value which clears it. Absent keys are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfilePatch {
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub civility: Option<Option<String>>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id_document: Option<Option<String>>,
    #[serde(deserialize_with = "present_date", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub license_number: Option<Option<String>>,
    #[serde(deserialize_with = "present_date", skip_serializing_if = "Option::is_none")]
    pub license_issue_date: Option<Option<NaiveDate>>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.civility.is_none()
            && self.id_document.is_none()
            && self.birth_date.is_none()
            && self.license_number.is_none()
            && self.license_issue_date.is_none()
            && self.address.is_none()
    }

    /// Same keys, with blank text collapsed to NULL
    pub fn normalized(&self) -> Self {
        let text = |v: &Option<Option<String>>| v.as_ref().map(|inner| normalize_text(inner.as_deref()));
        Self {
            civility: text(&self.civility),
            id_document: text(&self.id_document),
            birth_date: self.birth_date,
            license_number: text(&self.license_number),
            license_issue_date: self.license_issue_date,
            address: text(&self.address),
        }
    }

    /// Apply the patch to an in-memory profile
    pub fn apply_to(&self, profile: &mut Profile) {
        let patch = self.normalized();
        if let Some(v) = patch.civility {
            profile.civility = v;
        }
        if let Some(v) = patch.id_document {
            profile.id_document = v;
        }
        if let Some(v) = patch.birth_date {
            profile.birth_date = v;
        }
        if let Some(v) = patch.license_number {
            profile.license_number = v;
        }
        if let Some(v) = patch.license_issue_date {
            profile.license_issue_date = v;
        }
        if let Some(v) = patch.address {
            profile.address = v;
        }
    }
}
