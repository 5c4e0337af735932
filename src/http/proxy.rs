//! Forwarding to the upstream dashboard application.
//!
//! # Design Decisions
//! - Method, path, query, headers and body are passed through unchanged
//! - Bodies are streamed in both directions, never buffered
//! - No retries; a failed upstream call becomes 502
//! - A streamed body that runs past the body limit becomes 413, not 502

use std::error::Error as StdError;
use std::str::FromStr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, InvalidUriParts, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::LengthLimitError;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::json;
use thiserror::Error;

use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid upstream address '{0}'")]
    InvalidAddress(String),

    #[error("failed to build upstream uri: {0}")]
    Uri(#[from] InvalidUriParts),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),

    #[error("request body exceeds the configured limit")]
    BodyTooLarge,
}

impl From<hyper_util::client::legacy::Error> for ProxyError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        if exceeded_body_limit(&err) {
            ProxyError::BodyTooLarge
        } else {
            ProxyError::Upstream(err)
        }
    }
}

/// True if the body limit tripped while the request body was streaming.
fn exceeded_body_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ProxyError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream request failed",
            ),
            ProxyError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "Request body too large",
            ),
            ProxyError::InvalidAddress(_) | ProxyError::Uri(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Pooled HTTP client bound to one upstream.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl UpstreamClient {
    pub fn new(address: &str) -> Result<Self, ProxyError> {
        let authority = Authority::from_str(address)
            .map_err(|_| ProxyError::InvalidAddress(address.to_string()))?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Rewrite the request URI to the upstream and send it.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let (mut parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = Uri::from_parts(uri_parts)?;

        let response = self.client.request(Request::from_parts(parts, body)).await?;
        Ok(into_client_response(response))
    }
}

fn into_client_response(response: hyper::Response<Incoming>) -> Response {
    response.map(Body::new)
}

/// Fallback handler: everything the gate lets through goes upstream.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match state.upstream.forward(request).await {
        Ok(response) => {
            tracing::debug!(
                method = %method,
                path = %path,
                status = %response.status(),
                "Forwarded"
            );
            metrics::record_upstream(response.status().as_u16(), start);
            response
        }
        Err(e @ ProxyError::BodyTooLarge) => {
            tracing::warn!(method = %method, path = %path, "Request body over limit");
            e.into_response()
        }
        Err(e) => {
            tracing::error!(method = %method, path = %path, error = %e, "Upstream error");
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start);
            e.into_response()
        }
    }
}
