/// Service layer for the identity service
///
/// Provides the operations consumed by the HTTP layer:
/// - Identity resolution across the account and profile ID spaces
/// - Provisioning (create, attach profile, cascading delete)
/// - Account and profile updates
/// - Authentication and reservation readiness
pub mod authentication;
pub mod provisioning;
pub mod resolver;
pub mod update_merger;

pub use authentication::{AuthContext, AuthResult, AuthenticationService};
pub use provisioning::ProvisioningService;
pub use resolver::AccountResolver;
pub use update_merger::UpdateMerger;

use std::sync::Arc;

use crate::db::IdentityStore;
use crate::security::{PasswordHasher, SessionTokenIssuer};

/// All identity services wired to one store
pub struct IdentityServices<S> {
    pub resolver: AccountResolver<S>,
    pub provisioning: ProvisioningService<S>,
    pub updates: UpdateMerger<S>,
    pub authentication: AuthenticationService<S>,
}

impl<S: IdentityStore> IdentityServices<S> {
    pub fn new(store: Arc<S>, hasher: PasswordHasher, tokens: SessionTokenIssuer) -> Self {
        Self {
            resolver: AccountResolver::new(Arc::clone(&store)),
            provisioning: ProvisioningService::new(Arc::clone(&store), hasher.clone()),
            updates: UpdateMerger::new(Arc::clone(&store), hasher.clone()),
            authentication: AuthenticationService::new(store, hasher, tokens),
        }
    }
}
