//! RBAC introspection endpoints.
//!
//! These answer "what can I do?" and "why was this denied?" for the caller,
//! and list the permission table for operators holding `system:roles_read`.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use keystone_auth::Permission;

use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub permission: String,
}

#[derive(Debug, Serialize)]
struct RoleView<'a> {
    name: &'a str,
    permissions: Vec<&'a str>,
}

/// GET /rbac/permissions - effective permissions of the caller
pub async fn my_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    let resolver = services.resolver();
    let permissions: Vec<String> = resolver
        .resolve(principal.roles())
        .iter()
        .map(|p| p.to_string())
        .collect();

    Json(serde_json::json!({
        "principal_id": principal.principal_id().to_string(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "admin": principal.roles().iter().any(|r| r.is_admin()),
        "permissions": permissions,
        "table_version": resolver.table().version(),
    }))
}

/// GET /rbac/explain?permission=crm:read_customer
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ExplainQuery>,
) -> Response {
    let required = match Permission::parse(query.permission) {
        Ok(p) => p,
        Err(e) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_permission", e.to_string());
        }
    };

    let explanation = services.resolver().explain(principal.roles(), &required);
    (StatusCode::OK, Json(explanation)).into_response()
}

/// GET /rbac/roles - the permission table (requires `system:roles_read`)
pub async fn list_roles(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    let table = services.table();
    let roles: Vec<RoleView<'_>> = table
        .roles()
        .map(|(role, permissions)| RoleView {
            name: role.as_str(),
            permissions: permissions.iter().map(Permission::as_str).collect(),
        })
        .collect();

    Json(serde_json::json!({
        "version": table.version(),
        "roles": roles,
    }))
}
