use serde::{Deserialize, Serialize};

/// Which class of credential a guard, issuer or validator deals with.
///
/// User credentials are presented by clients; internal credentials are only
/// exchanged between the gateway and downstream services. The two realms are
/// signed with disjoint secrets (see [`crate::ensure_disjoint`]) and carried in
/// different headers, so a receiver always knows which secret to check against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialRealm {
    User,
    Internal,
}

impl CredentialRealm {
    /// Header that carries the bearer credential for this realm (lowercase).
    pub fn header_name(self) -> &'static str {
        match self {
            Self::User => "authorization",
            Self::Internal => "x-internal-authorization",
        }
    }

    /// Key namespace used by revocation backends.
    pub fn revocation_namespace(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Internal => "internal",
        }
    }

    pub fn as_str(self) -> &'static str {
        self.revocation_namespace()
    }
}

impl core::fmt::Display for CredentialRealm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
