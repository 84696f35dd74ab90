//! Guard and issuer wiring shared by every handler.

use std::sync::Arc;

use keystone_auth::{
    AccessGuard, CredentialRealm, Hs256JwtValidator, PermissionResolver, PermissionTable,
    RevocationStore, TokenIssuer,
};
use keystone_infra::AppConfig;

pub struct AppServices {
    pub user_guard: AccessGuard,
    pub internal_guard: AccessGuard,
    /// Mints end-user credentials on behalf of the profile service.
    pub user_issuer: TokenIssuer,
}

impl AppServices {
    pub fn resolver(&self) -> &PermissionResolver {
        self.user_guard.resolver()
    }

    pub fn table(&self) -> &PermissionTable {
        self.resolver().table()
    }
}

/// Revocation backends, one per realm so their entries never mix.
pub struct RevocationStores {
    pub user: Arc<dyn RevocationStore>,
    pub internal: Arc<dyn RevocationStore>,
}

pub fn build_services(
    config: &AppConfig,
    table: PermissionTable,
    stores: RevocationStores,
) -> AppServices {
    let resolver = PermissionResolver::new(Arc::new(table));

    let guard = |realm: CredentialRealm, store: Arc<dyn RevocationStore>| {
        let secret = match realm {
            CredentialRealm::User => &config.user_secret,
            CredentialRealm::Internal => &config.internal_secret,
        };
        let validator = Hs256JwtValidator::new(realm, secret).with_leeway(config.token_leeway);
        AccessGuard::new(Arc::new(validator), store, resolver.clone())
            .with_store_timeout(config.revocation_timeout)
    };

    AppServices {
        user_guard: guard(CredentialRealm::User, stores.user),
        internal_guard: guard(CredentialRealm::Internal, stores.internal),
        user_issuer: user_issuer(config),
    }
}

pub fn user_issuer(config: &AppConfig) -> TokenIssuer {
    TokenIssuer::new(CredentialRealm::User, &config.user_secret, config.token_ttl)
}

/// Mints service credentials for calls into `/internal`.
pub fn service_issuer(config: &AppConfig) -> TokenIssuer {
    TokenIssuer::new(
        CredentialRealm::Internal,
        &config.internal_secret,
        config.internal_token_ttl,
    )
}
