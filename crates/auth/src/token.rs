//! Credential issuance and verification (HS256 JWT).

use std::collections::HashSet;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::WireClaims;
use crate::{Claims, CredentialRealm, Principal, TokenId, TokenValidationError, validate_claims};

/// The only algorithm issued or accepted. Tokens declaring anything else are
/// rejected before signature verification.
const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("signing secret is empty")]
    Empty,

    #[error("user and internal credentials must use different signing secrets")]
    Shared,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("failed to encode credential: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    #[error("credential lifetime overflows the representable time range")]
    LifetimeOverflow,
}

/// HMAC secret for one credential realm. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, KeyError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Refuse a configuration in which one secret would verify both realms.
pub fn ensure_disjoint(user: &SigningSecret, internal: &SigningSecret) -> Result<(), KeyError> {
    if user == internal {
        return Err(KeyError::Shared);
    }
    Ok(())
}

/// A freshly minted credential and the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Mints signed credentials for already-verified principals.
pub struct TokenIssuer {
    realm: CredentialRealm,
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn default_ttl() -> Duration {
        Duration::hours(24)
    }

    pub fn new(realm: CredentialRealm, secret: &SigningSecret, ttl: Duration) -> Self {
        Self {
            realm,
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn realm(&self) -> CredentialRealm {
        self.realm
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, IssueError> {
        self.issue_at(principal, Utc::now())
    }

    /// Issue with an explicit clock (timestamps are truncated to whole seconds,
    /// the resolution of the wire format).
    pub fn issue_at(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, IssueError> {
        let issued_at = now.trunc_subsecs(0);
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(IssueError::LifetimeOverflow)?;
        let claims = Claims {
            sub: principal.id,
            display_name: principal.display_name.clone(),
            roles: principal.roles.clone(),
            issued_at,
            not_before: issued_at,
            expires_at,
            token_id: TokenId::new(),
        };

        let token = jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            &WireClaims::from(&claims),
            &self.key,
        )?;

        tracing::debug!(
            realm = %self.realm,
            principal_id = %claims.sub,
            token_id = %claims.token_id,
            "credential issued"
        );

        Ok(IssuedToken { token, claims })
    }
}

/// Verifies a bearer string and returns its claims.
///
/// Implementations are pure: no IO, no revocation lookups.
pub trait JwtValidator: Send + Sync {
    fn realm(&self) -> CredentialRealm;

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenValidationError>;
}

pub struct Hs256JwtValidator {
    realm: CredentialRealm,
    key: DecodingKey,
    validation: Validation,
    leeway: Duration,
}

impl Hs256JwtValidator {
    pub fn new(realm: CredentialRealm, secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Time checks run in `validate_claims` against the caller's clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            realm,
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            leeway: Duration::zero(),
        }
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn realm(&self) -> CredentialRealm {
        self.realm
    }

    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenValidationError> {
        let data = jsonwebtoken::decode::<WireClaims>(token, &self.key, &self.validation)
            .map_err(|e| map_jwt_error(e.kind()))?;

        let claims = Claims::try_from(data.claims)?;
        validate_claims(&claims, now, self.leeway)?;
        Ok(claims)
    }
}

fn map_jwt_error(kind: &ErrorKind) -> TokenValidationError {
    match kind {
        ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenValidationError::UnexpectedAlgorithm
        }
        ErrorKind::ExpiredSignature => TokenValidationError::Expired,
        ErrorKind::ImmatureSignature => TokenValidationError::NotYetValid,
        ErrorKind::MissingRequiredClaim(_) => TokenValidationError::ClaimsIncomplete,
        _ => TokenValidationError::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PrincipalId, Role};
    use proptest::prelude::*;
    use serde_json::json;

    const USER_SECRET: &[u8] = b"user-secret-for-tests";
    const INTERNAL_SECRET: &[u8] = b"internal-secret-for-tests";

    fn secret(bytes: &[u8]) -> SigningSecret {
        SigningSecret::new(bytes.to_vec()).unwrap()
    }

    fn issuer(realm: CredentialRealm, bytes: &[u8]) -> TokenIssuer {
        TokenIssuer::new(realm, &secret(bytes), TokenIssuer::default_ttl())
    }

    fn validator(realm: CredentialRealm, bytes: &[u8]) -> Hs256JwtValidator {
        Hs256JwtValidator::new(realm, &secret(bytes))
    }

    fn principal() -> Principal {
        Principal::new(PrincipalId::new(), "Grace Hopper", vec![Role::SALESPERSON])
    }

    fn forge(payload: serde_json::Value, alg: Algorithm, key: &[u8]) -> String {
        jsonwebtoken::encode(&Header::new(alg), &payload, &EncodingKey::from_secret(key)).unwrap()
    }

    #[test]
    fn issued_token_validates_with_matching_claims() {
        let p = principal();
        let issued = issuer(CredentialRealm::User, USER_SECRET).issue(&p).unwrap();
        let claims = validator(CredentialRealm::User, USER_SECRET)
            .validate(&issued.token, Utc::now())
            .unwrap();

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.sub, p.id);
        assert_eq!(claims.display_name, "Grace Hopper");
        assert_eq!(claims.roles, vec![Role::SALESPERSON]);
        assert_eq!(claims.expires_at - claims.issued_at, Duration::hours(24));
    }

    #[test]
    fn each_issue_gets_a_fresh_token_id() {
        let i = issuer(CredentialRealm::User, USER_SECRET);
        let p = principal();
        let a = i.issue(&p).unwrap();
        let b = i.issue(&p).unwrap();
        assert_ne!(a.claims.token_id, b.claims.token_id);
    }

    #[test]
    fn expired_token_is_rejected_even_with_valid_signature() {
        let long_ago = Utc::now() - Duration::days(3);
        let issued = issuer(CredentialRealm::User, USER_SECRET)
            .issue_at(&principal(), long_ago)
            .unwrap();

        assert_eq!(
            validator(CredentialRealm::User, USER_SECRET).validate(&issued.token, Utc::now()),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn future_token_is_not_yet_valid() {
        let later = Utc::now() + Duration::hours(1);
        let issued = issuer(CredentialRealm::User, USER_SECRET)
            .issue_at(&principal(), later)
            .unwrap();

        assert_eq!(
            validator(CredentialRealm::User, USER_SECRET).validate(&issued.token, Utc::now()),
            Err(TokenValidationError::NotYetValid)
        );
    }

    #[test]
    fn future_not_before_is_not_yet_valid() {
        let now = Utc::now().timestamp();
        let token = forge(
            json!({
                "sub": PrincipalId::new().to_string(),
                "name": "Ada",
                "roles": ["viewer"],
                "iat": now,
                "nbf": now + 3600,
                "exp": now + 7200,
                "jti": TokenId::new().to_string(),
            }),
            Algorithm::HS256,
            USER_SECRET,
        );
        let v = validator(CredentialRealm::User, USER_SECRET);

        assert_eq!(
            v.validate(&token, Utc::now()),
            Err(TokenValidationError::NotYetValid)
        );
        let later = DateTime::from_timestamp(now + 3600, 0).unwrap();
        assert_eq!(v.validate(&token, later).map(|c| c.not_before), Ok(later));
    }

    #[test]
    fn oversized_ttl_is_an_issue_error() {
        let i = TokenIssuer::new(
            CredentialRealm::User,
            &secret(USER_SECRET),
            Duration::seconds(9_000_000_000_000),
        );
        assert!(matches!(
            i.issue(&principal()),
            Err(IssueError::LifetimeOverflow)
        ));
    }

    #[test]
    fn realms_do_not_cross_validate() {
        let p = principal();
        let user_token = issuer(CredentialRealm::User, USER_SECRET).issue(&p).unwrap();
        let internal_token = issuer(CredentialRealm::Internal, INTERNAL_SECRET)
            .issue(&p)
            .unwrap();
        let now = Utc::now();

        assert_eq!(
            validator(CredentialRealm::Internal, INTERNAL_SECRET).validate(&user_token.token, now),
            Err(TokenValidationError::InvalidSignature)
        );
        assert_eq!(
            validator(CredentialRealm::User, USER_SECRET).validate(&internal_token.token, now),
            Err(TokenValidationError::InvalidSignature)
        );
    }

    #[test]
    fn algorithm_substitution_is_rejected() {
        let now = Utc::now().timestamp();
        let token = forge(
            json!({
                "sub": PrincipalId::new().to_string(),
                "jti": TokenId::new().to_string(),
                "iat": now,
                "exp": now + 600,
            }),
            Algorithm::HS512,
            USER_SECRET,
        );

        assert_eq!(
            validator(CredentialRealm::User, USER_SECRET).validate(&token, Utc::now()),
            Err(TokenValidationError::UnexpectedAlgorithm)
        );
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let issued = issuer(CredentialRealm::User, USER_SECRET)
            .issue(&principal())
            .unwrap();
        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();
        let other = issuer(CredentialRealm::User, USER_SECRET)
            .issue(&Principal::new(PrincipalId::new(), "Mallory", vec![Role::ADMIN]))
            .unwrap();
        parts[1] = other.token.split('.').nth(1).unwrap().to_string();

        assert_eq!(
            validator(CredentialRealm::User, USER_SECRET).validate(&parts.join("."), Utc::now()),
            Err(TokenValidationError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let v = validator(CredentialRealm::User, USER_SECRET);
        for token in ["", "abc", "a.b.c", "not.a.jwt.at.all"] {
            assert_eq!(
                v.validate(token, Utc::now()),
                Err(TokenValidationError::Malformed),
                "{token}"
            );
        }
    }

    #[test]
    fn missing_principal_id_is_claims_incomplete() {
        let now = Utc::now().timestamp();
        let token = forge(
            json!({ "jti": TokenId::new().to_string(), "iat": now, "exp": now + 600 }),
            Algorithm::HS256,
            USER_SECRET,
        );
        assert_eq!(
            validator(CredentialRealm::User, USER_SECRET).validate(&token, Utc::now()),
            Err(TokenValidationError::ClaimsIncomplete)
        );

        let token = forge(
            json!({
                "sub": PrincipalId::new().to_string(),
                "jti": TokenId::new().to_string(),
                "iat": now,
            }),
            Algorithm::HS256,
            USER_SECRET,
        );
        assert_eq!(
            validator(CredentialRealm::User, USER_SECRET).validate(&token, Utc::now()),
            Err(TokenValidationError::ClaimsIncomplete)
        );
    }

    #[test]
    fn invalid_role_names_are_malformed() {
        let now = Utc::now().timestamp();
        let token = forge(
            json!({
                "sub": PrincipalId::new().to_string(),
                "jti": TokenId::new().to_string(),
                "roles": ["viewer", "Root User"],
                "iat": now,
                "exp": now + 600,
            }),
            Algorithm::HS256,
            USER_SECRET,
        );
        assert_eq!(
            validator(CredentialRealm::User, USER_SECRET).validate(&token, Utc::now()),
            Err(TokenValidationError::Malformed)
        );
    }

    #[test]
    fn secrets_must_be_present_and_disjoint() {
        assert_eq!(SigningSecret::new(Vec::new()), Err(KeyError::Empty));
        assert_eq!(
            ensure_disjoint(&secret(USER_SECRET), &secret(USER_SECRET)),
            Err(KeyError::Shared)
        );
        assert_eq!(
            ensure_disjoint(&secret(USER_SECRET), &secret(INTERNAL_SECRET)),
            Ok(())
        );
        assert!(!format!("{:?}", secret(USER_SECRET)).contains("user-secret"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn validate_inverts_issue(
            name in "[A-Za-z ]{1,40}",
            role_idx in proptest::collection::vec(0usize..6, 0..4),
            ttl_secs in 1i64..(30 * 24 * 3600),
        ) {
            let all = [
                Role::ADMIN,
                Role::MANAGER,
                Role::SALESPERSON,
                Role::SUPPORT,
                Role::ACCOUNTANT,
                Role::VIEWER,
            ];
            let roles: Vec<Role> = role_idx.iter().map(|i| all[*i].clone()).collect();
            let p = Principal::new(PrincipalId::new(), name.clone(), roles.clone());
            let i = TokenIssuer::new(
                CredentialRealm::User,
                &secret(USER_SECRET),
                Duration::seconds(ttl_secs),
            );
            let issued = i.issue(&p).unwrap();

            let claims = validator(CredentialRealm::User, USER_SECRET)
                .validate(&issued.token, issued.claims.issued_at)
                .unwrap();

            prop_assert_eq!(claims.sub, p.id);
            prop_assert_eq!(claims.display_name, name);
            prop_assert_eq!(claims.roles, roles);
            prop_assert_eq!(claims.expires_at - claims.issued_at, Duration::seconds(ttl_secs));
        }
    }
}
