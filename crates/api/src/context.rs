use chrono::{DateTime, Utc};

use keystone_auth::{PrincipalId, Role, TokenId, VerifiedIdentity};

/// End-user context for a request (verified identity + roles).
///
/// Only inserted by the user-realm guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    identity: VerifiedIdentity,
}

impl PrincipalContext {
    pub fn new(identity: VerifiedIdentity) -> Self {
        Self { identity }
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.identity.principal_id
    }

    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn roles(&self) -> &[Role] {
        &self.identity.roles
    }

    pub fn token_id(&self) -> TokenId {
        self.identity.token_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.identity.expires_at
    }

    pub fn identity(&self) -> &VerifiedIdentity {
        &self.identity
    }
}

/// Calling-service context for `/internal` routes.
///
/// Only inserted by the internal-realm guard, so a handler that extracts it
/// can never be reached with an end-user credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    identity: VerifiedIdentity,
}

impl ServiceContext {
    pub fn new(identity: VerifiedIdentity) -> Self {
        Self { identity }
    }

    pub fn service_id(&self) -> PrincipalId {
        self.identity.principal_id
    }

    pub fn service_name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn identity(&self) -> &VerifiedIdentity {
        &self.identity
    }
}
