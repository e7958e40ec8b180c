use serde::{Deserialize, Serialize};

use super::Readiness;
use crate::error::{IdentityError, Result};
use crate::models::RequiredProfileField;

/// Login lifecycle of a session
///
/// ```text
/// Unauthenticated -> Authenticating -> AuthenticatedComplete
///                                   -> AuthenticatedIncomplete -(profile edit)-> AuthenticatedComplete
/// ```
///
/// Booking is only permitted in `AuthenticatedComplete`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LoginState {
    #[default]
    Unauthenticated,
    Authenticating,
    AuthenticatedComplete,
    #[serde(rename_all = "camelCase")]
    AuthenticatedIncomplete {
        missing_fields: Vec<RequiredProfileField>,
    },
}

impl LoginState {
    pub fn begin(self) -> Result<Self> {
        match self {
            LoginState::Unauthenticated => Ok(LoginState::Authenticating),
            other => Err(invalid_transition(&other, "begin")),
        }
    }

    /// Credentials rejected
    pub fn fail(self) -> Result<Self> {
        match self {
            LoginState::Authenticating => Ok(LoginState::Unauthenticated),
            other => Err(invalid_transition(&other, "fail")),
        }
    }

    /// Credentials accepted, settle on the readiness gate
    pub fn settle(self, readiness: &Readiness) -> Result<Self> {
        match self {
            LoginState::Authenticating => Ok(Self::from_readiness(readiness)),
            other => Err(invalid_transition(&other, "settle")),
        }
    }

    /// Re-evaluate after the profile was edited
    pub fn on_profile_updated(self, readiness: &Readiness) -> Result<Self> {
        match self {
            LoginState::AuthenticatedIncomplete { .. } | LoginState::AuthenticatedComplete => {
                Ok(Self::from_readiness(readiness))
            }
            other => Err(invalid_transition(&other, "on_profile_updated")),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            LoginState::AuthenticatedComplete | LoginState::AuthenticatedIncomplete { .. }
        )
    }

    pub fn booking_permitted(&self) -> bool {
        matches!(self, LoginState::AuthenticatedComplete)
    }

    fn from_readiness(readiness: &Readiness) -> Self {
        if readiness.profile_complete {
            LoginState::AuthenticatedComplete
        } else {
            LoginState::AuthenticatedIncomplete {
                missing_fields: readiness.missing_fields.clone(),
            }
        }
    }
}

fn invalid_transition(state: &LoginState, event: &str) -> IdentityError {
    IdentityError::Internal(format!(
        "Invalid login transition: {} from {:?}",
        event, state
    ))
}
