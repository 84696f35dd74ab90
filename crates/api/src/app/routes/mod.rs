use axum::{
    Router,
    routing::{get, post},
};

use keystone_auth::permissions::system as system_perms;

use crate::app::AppServices;
use crate::middleware::protect;

pub mod auth;
pub mod internal;
pub mod rbac;
pub mod system;

/// Router for every guarded endpoint.
///
/// User routes sit behind the user-realm guard; `/internal` sits behind the
/// internal-realm guard only.
pub fn router(services: &AppServices) -> Router {
    let authenticated = Router::new()
        .route("/whoami", get(system::whoami))
        .route("/auth/logout", post(auth::logout))
        .route("/rbac/permissions", get(rbac::my_permissions))
        .route("/rbac/explain", get(rbac::explain));

    let roles = Router::new().route("/rbac/roles", get(rbac::list_roles));

    protect(authenticated, &services.user_guard, None)
        .merge(protect(
            roles,
            &services.user_guard,
            Some(system_perms::ROLES_READ),
        ))
        .nest(
            "/internal",
            protect(internal::router(), &services.internal_guard, None),
        )
}
