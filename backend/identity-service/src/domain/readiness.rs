use serde::{Deserialize, Serialize};

use crate::models::{Profile, RequiredProfileField, Role};

/// Whether an account may proceed to booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    pub profile_complete: bool,
    /// Missing fields in canonical order
    pub missing_fields: Vec<RequiredProfileField>,
}

impl Readiness {
    pub fn complete() -> Self {
        Self {
            profile_complete: true,
            missing_fields: Vec::new(),
        }
    }

    /// Completeness of a client's profile; no profile means every field is missing
    pub fn for_profile(profile: Option<&Profile>) -> Self {
        let missing_fields: Vec<RequiredProfileField> = match profile {
            None => RequiredProfileField::ALL.to_vec(),
            Some(profile) => RequiredProfileField::ALL
                .into_iter()
                .filter(|field| !profile.is_filled(*field))
                .collect(),
        };

        Self {
            profile_complete: missing_fields.is_empty(),
            missing_fields,
        }
    }

    /// Staff accounts are never gated on a rental profile
    pub fn for_account(role: Role, profile: Option<&Profile>) -> Self {
        match role {
            Role::Client => Self::for_profile(profile),
            Role::Admin | Role::Assistant => Self::complete(),
        }
    }
}
