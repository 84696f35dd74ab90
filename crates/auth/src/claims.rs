use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PrincipalId, Role, TokenId};

/// Verified claims carried by a credential.
///
/// Values of this type only come out of [`crate::TokenIssuer`] or a successful
/// [`crate::JwtValidator::validate`]; the wire form is [`WireClaims`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    pub display_name: String,

    /// RBAC roles granted to the principal.
    pub roles: Vec<Role>,

    pub issued_at: DateTime<Utc>,

    /// Never earlier than `issued_at`.
    pub not_before: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Unique credential identifier used for revocation.
    pub token_id: TokenId,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("credential is malformed")]
    Malformed,

    #[error("credential signature is invalid")]
    InvalidSignature,

    #[error("credential was signed with an unexpected algorithm")]
    UnexpectedAlgorithm,

    #[error("credential has expired")]
    Expired,

    #[error("credential not yet valid (issued_at or not_before is in the future)")]
    NotYetValid,

    #[error("credential is missing required claims")]
    ClaimsIncomplete,

    #[error("invalid credential time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

impl TokenValidationError {
    /// Machine-readable kind, surfaced to clients alongside the denial reason.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::UnexpectedAlgorithm => "unexpected_algorithm",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::ClaimsIncomplete => "claims_incomplete",
            Self::InvalidTimeWindow => "invalid_time_window",
        }
    }
}

/// Deterministically validate the claims' time window.
///
/// `leeway` widens both edges to absorb clock skew between services.
pub fn validate_claims(
    claims: &Claims,
    now: DateTime<Utc>,
    leeway: Duration,
) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now + leeway < claims.issued_at.max(claims.not_before) {
        return Err(TokenValidationError::NotYetValid);
    }
    if now - leeway >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// JWT payload as it travels on the wire (registered claim names, unix seconds).
///
/// Every field is optional on the way in so that a missing claim is reported as
/// [`TokenValidationError::ClaimsIncomplete`] rather than a decoding failure.
/// Role names are validated while decoding.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl From<&Claims> for WireClaims {
    fn from(claims: &Claims) -> Self {
        Self {
            sub: Some(claims.sub.to_string()),
            name: claims.display_name.clone(),
            roles: claims.roles.clone(),
            iat: Some(claims.issued_at.timestamp()),
            nbf: Some(claims.not_before.timestamp()),
            exp: Some(claims.expires_at.timestamp()),
            jti: Some(claims.token_id.to_string()),
        }
    }
}

fn required<T>(value: Option<T>) -> Result<T, TokenValidationError> {
    value.ok_or(TokenValidationError::ClaimsIncomplete)
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenValidationError> {
    DateTime::from_timestamp(secs, 0).ok_or(TokenValidationError::Malformed)
}

impl TryFrom<WireClaims> for Claims {
    type Error = TokenValidationError;

    fn try_from(wire: WireClaims) -> Result<Self, Self::Error> {
        let sub = required(wire.sub.filter(|s| !s.trim().is_empty()))?;
        let jti = required(wire.jti.filter(|s| !s.trim().is_empty()))?;
        let issued_at = timestamp(required(wire.iat)?)?;
        let expires_at = timestamp(required(wire.exp)?)?;
        let not_before = match wire.nbf {
            Some(nbf) => timestamp(nbf)?.max(issued_at),
            None => issued_at,
        };

        Ok(Self {
            sub: sub.parse().map_err(|_| TokenValidationError::Malformed)?,
            display_name: wire.name,
            roles: wire.roles,
            issued_at,
            not_before,
            expires_at,
            token_id: jti.parse().map_err(|_| TokenValidationError::Malformed)?,
        })
    }
}
