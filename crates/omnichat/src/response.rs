//! JSON error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::llm::{Adapter, CompletionError, LLMError};

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    adapter: Option<Adapter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
}

fn error(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            kind,
            message: message.into(),
            provider: None,
            adapter: None,
            upstream_status: None,
        },
    };
    (status, Json(body)).into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    error(StatusCode::BAD_REQUEST, "bad_request", message)
}

/// Map a dispatcher failure to a status code and JSON body.
pub fn completion_error(err: &CompletionError) -> Response {
    let (status, kind) = match &err.source {
        LLMError::InvalidConversation(_) => (StatusCode::BAD_REQUEST, "invalid_conversation"),
        LLMError::Authentication { .. } => (StatusCode::UNAUTHORIZED, "authentication_failed"),
        LLMError::RateLimit { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        LLMError::NotImplemented { .. } => (StatusCode::NOT_IMPLEMENTED, "not_implemented"),
        LLMError::InvalidEndpoint(_) => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_endpoint"),
        LLMError::Api { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
        LLMError::InvalidResponse(_) => (StatusCode::BAD_GATEWAY, "invalid_upstream_response"),
        LLMError::Request(_) => (StatusCode::BAD_GATEWAY, "transport_error"),
    };

    let body = ErrorBody {
        error: ErrorDetail {
            kind,
            message: err.source.to_string(),
            provider: Some(err.provider.clone()),
            adapter: Some(err.adapter),
            upstream_status: err.source.status(),
        },
    };
    (status, Json(body)).into_response()
}
