//! Service-to-service endpoints.
//!
//! Reachable only with an internal-realm credential in
//! `X-Internal-Authorization`; a user token never gets past the guard.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keystone_auth::{Principal, PrincipalId, Role, TokenId};

use crate::app::{errors, services::AppServices};
use crate::context::ServiceContext;

pub fn router() -> Router {
    Router::new()
        .route("/tokens", post(issue_user_token))
        .route("/whoami", get(whoami))
}

/// A principal the calling service has already authenticated.
#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    pub id: PrincipalId,
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Serialize)]
pub struct IssueTokenResponse {
    pub token: String,
    pub token_id: TokenId,
    pub principal_id: PrincipalId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// POST /internal/tokens - mint an end-user credential.
pub async fn issue_user_token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<ServiceContext>,
    Json(req): Json<IssueTokenRequest>,
) -> Response {
    let principal =
        match Principal::with_known_roles(req.id, req.display_name, req.roles, services.table()) {
            Ok(p) => p,
            Err(e) => return errors::domain_error_to_response(e),
        };

    let issued = match services.user_issuer.issue(&principal) {
        Ok(issued) => issued,
        Err(e) => return errors::issue_error_to_response(e),
    };

    tracing::info!(
        service = caller.service_name(),
        principal_id = %principal.id,
        token_id = %issued.claims.token_id,
        "user credential issued"
    );

    (
        StatusCode::CREATED,
        Json(IssueTokenResponse {
            token: issued.token,
            token_id: issued.claims.token_id,
            principal_id: issued.claims.sub,
            issued_at: issued.claims.issued_at,
            expires_at: issued.claims.expires_at,
        }),
    )
        .into_response()
}

/// GET /internal/whoami - identity of the calling service
pub async fn whoami(Extension(caller): Extension<ServiceContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "realm": caller.identity().realm,
        "service_id": caller.service_id().to_string(),
        "service_name": caller.service_name(),
        "token_id": caller.identity().token_id.to_string(),
        "expires_at": caller.identity().expires_at,
    }))
}
