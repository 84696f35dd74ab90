use std::sync::Arc;

use axum::{
    Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use keystone_auth::RevokeOutcome;

use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

/// POST /auth/logout - revoke the presented credential for the rest of its
/// lifetime.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services
        .user_guard
        .revoke(principal.identity(), Utc::now())
        .await
    {
        Ok(RevokeOutcome::Revoked | RevokeOutcome::AlreadyExpired) => {
            StatusCode::NO_CONTENT.into_response()
        }
        Err(denial) => errors::denial_to_response(&denial),
    }
}
