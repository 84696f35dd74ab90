//! `keystone-auth`: the access-control boundary shared by the gateway and
//! every downstream service.
//!
//! This crate is intentionally decoupled from HTTP and from any concrete
//! revocation backend: it issues and verifies credentials, resolves role
//! permissions and composes those steps into the per-request [`AccessGuard`].

pub mod claims;
pub mod guard;
pub mod permissions;
pub mod principal;
pub mod realm;
pub mod resolver;
pub mod revocation;
pub mod roles;
pub mod table;
pub mod token;

pub use claims::{Claims, TokenValidationError, validate_claims};
pub use guard::{AccessGuard, Denial, VerifiedIdentity, extract_bearer};
pub use permissions::{Permission, PermissionParseError};
pub use principal::Principal;
pub use realm::CredentialRealm;
pub use resolver::{AuthorizationExplanation, AuthzError, PermissionResolver};
pub use revocation::{
    InMemoryRevocationStore, RevocationError, RevocationStore, RevokeOutcome, remaining_lifetime,
};
pub use roles::{Role, RoleParseError};
pub use table::{PermissionTable, PermissionTableError};
pub use token::{
    Hs256JwtValidator, IssueError, IssuedToken, JwtValidator, KeyError, SigningSecret, TokenIssuer,
    ensure_disjoint,
};

pub use keystone_core::{PrincipalId, TokenId};
