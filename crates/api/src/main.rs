use std::sync::Arc;

use anyhow::Context;

use keystone_api::app::{self, RevocationStores};
use keystone_auth::{CredentialRealm, Principal, PrincipalId};
use keystone_infra::revocation::RedisRevocationStore;
use keystone_infra::{AppConfig, load_permission_table};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    keystone_observability::init();

    let config = AppConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "refusing to start: invalid configuration");
    })?;

    // `keystone-gateway service-token <name>` prints an internal credential
    // for provisioning a downstream service, then exits.
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, name] = args.as_slice() {
        if command == "service-token" {
            let service = Principal::new(PrincipalId::new(), name.clone(), Vec::new());
            let issued = app::service_issuer(&config).issue(&service)?;
            println!("{}", issued.token);
            return Ok(());
        }
    }

    let table = load_permission_table(&config)?;

    let stores = RevocationStores {
        user: Arc::new(
            RedisRevocationStore::connect(&config.redis_url, CredentialRealm::User)
                .await
                .context("connecting user revocation store")?,
        ),
        internal: Arc::new(
            RedisRevocationStore::connect(&config.redis_url, CredentialRealm::Internal)
                .await
                .context("connecting internal revocation store")?,
        ),
    };

    let services = app::build_services(&config, table, stores);
    let router = app::build_app(services, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router).await?;
    Ok(())
}
