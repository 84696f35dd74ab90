//! HTTP gateway wiring (Axum router + guard wiring).
//!
//! - `services.rs`: guards, issuers and revocation stores
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, RevocationStores, build_services, service_issuer, user_issuer};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// `request_timeout` bounds the whole request, guard included.
pub fn build_app(services: AppServices, request_timeout: Duration) -> Router {
    let services = Arc::new(services);

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router(&services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(Extension(services)),
        )
}
