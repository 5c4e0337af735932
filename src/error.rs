//! Gate rejection types.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Why the gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    /// Too many requests from one identifier in the current window.
    /// Retry after `retry_after`.
    #[error("rate limit exceeded for client {client}")]
    RateLimited { client: String, retry_after: Duration },

    /// Protected route with a configured secret and a missing or wrong key.
    #[error("unauthorized request to {path}")]
    Unauthorized { path: String },

    /// Path that cannot be put in canonical form.
    #[error("malformed request path {path}")]
    MalformedPath { path: String },
}

impl GateRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            GateRejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GateRejection::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            GateRejection::MalformedPath { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, GateRejection::RateLimited { .. })
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            GateRejection::RateLimited { retry_after, .. } => {
                let secs = retry_after.as_secs();
                let body = Json(json!({
                    "error": {
                        "code": "RATE_LIMITED",
                        "message": "Too many requests",
                        "retry_after_secs": secs,
                    }
                }));
                let mut response = (status, body).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                response
            }
            GateRejection::Unauthorized { .. } => {
                let body = Json(json!({
                    "error": {
                        "code": "UNAUTHORIZED",
                        "message": "Valid API key required",
                    }
                }));
                (status, body).into_response()
            }
            GateRejection::MalformedPath { .. } => {
                let body = Json(json!({
                    "error": {
                        "code": "MALFORMED_PATH",
                        "message": "Request path is not valid",
                    }
                }));
                (status, body).into_response()
            }
        }
    }
}
