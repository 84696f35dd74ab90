//! The per-request access decision.
//!
//! `extract → validate → revocation check → permission check → ALLOW`.
//! Every step runs once, in order, with no retries. Any failure is a terminal
//! [`Denial`]; a revocation store that errors or does not answer within the
//! configured bound denies the request (fail closed).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::resolver::AuthzError;
use crate::revocation::remaining_lifetime;
use crate::{
    Claims, CredentialRealm, JwtValidator, Permission, PermissionResolver, PrincipalId,
    RevocationError, RevocationStore, RevokeOutcome, Role, TokenId, TokenValidationError,
};

/// Upper bound for a single revocation store round trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Denial {
    #[error("no bearer credential presented")]
    NoCredential,

    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] TokenValidationError),

    #[error("credential has been revoked")]
    Revoked,

    #[error("access check could not complete: {0}")]
    Unavailable(RevocationError),

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

impl Denial {
    /// Machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoCredential => "no_credential",
            Self::InvalidCredential(_) => "invalid_credential",
            Self::Revoked => "revoked",
            Self::Unavailable(_) => "unavailable",
            Self::Forbidden(_) => "forbidden",
        }
    }

    /// Sub-code for invalid credentials (`expired`, `invalid_signature`, ...).
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Self::InvalidCredential(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<AuthzError> for Denial {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Forbidden(p) => Self::Forbidden(p),
        }
    }
}

/// Identity exposed to handlers after an ALLOW decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    pub realm: CredentialRealm,
    pub principal_id: PrincipalId,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub token_id: TokenId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedIdentity {
    fn from_claims(realm: CredentialRealm, claims: Claims) -> Self {
        Self {
            realm,
            principal_id: claims.sub,
            display_name: claims.display_name,
            roles: claims.roles,
            token_id: claims.token_id,
            issued_at: claims.issued_at,
            expires_at: claims.expires_at,
        }
    }
}

/// Pull the token out of an `Authorization`-style header value.
///
/// The scheme is matched case-insensitively; the token must be non-empty.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, Denial> {
    let header = header.ok_or(Denial::NoCredential)?;
    let (scheme, token) = header.trim().split_once(' ').ok_or(Denial::NoCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Denial::NoCredential);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(Denial::NoCredential);
    }
    Ok(token)
}

/// Composed access decision for one credential realm.
///
/// Cheap to clone and safe to share across request handlers.
#[derive(Clone)]
pub struct AccessGuard {
    validator: Arc<dyn JwtValidator>,
    revocations: Arc<dyn RevocationStore>,
    resolver: PermissionResolver,
    store_timeout: Duration,
}

impl AccessGuard {
    pub fn new(
        validator: Arc<dyn JwtValidator>,
        revocations: Arc<dyn RevocationStore>,
        resolver: PermissionResolver,
    ) -> Self {
        Self {
            validator,
            revocations,
            resolver,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound each revocation store call. Must stay below the request deadline.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn realm(&self) -> CredentialRealm {
        self.validator.realm()
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub async fn check(
        &self,
        authorization: Option<&str>,
        required: Option<&Permission>,
    ) -> Result<VerifiedIdentity, Denial> {
        self.check_at(authorization, required, Utc::now()).await
    }

    pub async fn check_at(
        &self,
        authorization: Option<&str>,
        required: Option<&Permission>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedIdentity, Denial> {
        let decision = self.evaluate(authorization, required, now).await;
        if let Err(denial) = &decision {
            tracing::debug!(
                realm = %self.realm(),
                reason = denial.reason(),
                kind = denial.kind().unwrap_or("-"),
                "access denied"
            );
        }
        decision
    }

    async fn evaluate(
        &self,
        authorization: Option<&str>,
        required: Option<&Permission>,
        now: DateTime<Utc>,
    ) -> Result<VerifiedIdentity, Denial> {
        let token = extract_bearer(authorization)?;
        let claims = self.validator.validate(token, now)?;

        let revoked = self
            .bounded(self.revocations.is_revoked(claims.token_id))
            .await?;
        if revoked {
            return Err(Denial::Revoked);
        }

        if let Some(required) = required {
            self.resolver.authorize(&claims.roles, required)?;
        }

        Ok(VerifiedIdentity::from_claims(self.realm(), claims))
    }

    /// Revoke an already-verified credential for the rest of its lifetime.
    pub async fn revoke(
        &self,
        identity: &VerifiedIdentity,
        now: DateTime<Utc>,
    ) -> Result<RevokeOutcome, Denial> {
        let Some(ttl) = remaining_lifetime(identity.expires_at, now) else {
            return Ok(RevokeOutcome::AlreadyExpired);
        };

        self.bounded(self.revocations.revoke(identity.token_id, ttl))
            .await?;

        tracing::info!(
            realm = %self.realm(),
            principal_id = %identity.principal_id,
            token_id = %identity.token_id,
            ttl_secs = ttl.as_secs(),
            "credential revoked"
        );
        Ok(RevokeOutcome::Revoked)
    }

    /// Validate the presented credential, then revoke it.
    pub async fn logout(&self, authorization: Option<&str>) -> Result<RevokeOutcome, Denial> {
        let now = Utc::now();
        let identity = self.check_at(authorization, None, now).await?;
        self.revoke(&identity, now).await
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RevocationError>>,
    ) -> Result<T, Denial> {
        let result = match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RevocationError::Timeout),
        };
        result.map_err(|e| {
            tracing::warn!(realm = %self.realm(), error = %e, "revocation store call failed");
            Denial::Unavailable(e)
        })
    }
}
