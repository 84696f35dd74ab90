use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use keystone_auth::{Denial, IssueError};
use keystone_core::DomainError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    message: String,
}

pub fn denial_to_response(denial: &Denial) -> Response {
    let status = match denial {
        Denial::NoCredential | Denial::InvalidCredential(_) | Denial::Revoked => {
            StatusCode::UNAUTHORIZED
        }
        Denial::Forbidden(_) => StatusCode::FORBIDDEN,
        Denial::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let mut response = error_response(
        status,
        denial.reason(),
        denial.kind(),
        denial.to_string(),
    );
    if status == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::Unauthorized => json_error(StatusCode::FORBIDDEN, "forbidden", "forbidden"),
    }
}

pub fn issue_error_to_response(err: IssueError) -> Response {
    tracing::error!(error = %err, "credential issuance failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "issue_error",
        "credential could not be issued",
    )
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    error_response(status, code, None, message.into())
}

fn error_response(
    status: StatusCode,
    code: &'static str,
    kind: Option<&'static str>,
    message: String,
) -> Response {
    (
        status,
        axum::Json(ErrorBody {
            error: code,
            kind,
            message,
        }),
    )
        .into_response()
}
