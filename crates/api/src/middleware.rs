use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self as axum_middleware, Next},
    response::Response,
};

use keystone_auth::{AccessGuard, CredentialRealm, Permission};

use crate::app::errors;
use crate::context::{PrincipalContext, ServiceContext};

/// Guard configuration for one group of routes.
#[derive(Clone)]
pub struct GuardState {
    pub guard: AccessGuard,
    pub required: Option<Permission>,
}

/// Run the access decision for the guard's realm and expose the verified
/// identity to handlers.
///
/// Only the realm's own header is consulted: the user guard reads
/// `Authorization`, the internal guard reads `X-Internal-Authorization`.
pub async fn access_guard(
    State(state): State<GuardState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let realm = state.guard.realm();
    let header = req
        .headers()
        .get(realm.header_name())
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let identity = match state
        .guard
        .check(header.as_deref(), state.required.as_ref())
        .await
    {
        Ok(identity) => identity,
        Err(denial) => {
            tracing::info!(
                realm = %realm,
                method = %req.method(),
                path = %req.uri().path(),
                reason = denial.reason(),
                kind = denial.kind().unwrap_or("-"),
                "request denied"
            );
            return errors::denial_to_response(&denial);
        }
    };

    match realm {
        CredentialRealm::User => {
            req.extensions_mut().insert(PrincipalContext::new(identity));
        }
        CredentialRealm::Internal => {
            req.extensions_mut().insert(ServiceContext::new(identity));
        }
    }

    next.run(req).await
}

/// Put every route of `router` behind `guard`, optionally requiring a
/// permission.
pub fn protect(router: Router, guard: &AccessGuard, required: Option<Permission>) -> Router {
    router.route_layer(axum_middleware::from_fn_with_state(
        GuardState {
            guard: guard.clone(),
            required,
        },
        access_guard,
    ))
}
