//! Request gate middleware.
//!
//! Every request passes through [`RequestGate::evaluate`]:
//!
//! ```text
//! malformed path      → 400
//! outside API prefix  → forward untouched
//! public route        → forward untouched (no rate limit, no auth)
//! otherwise           → rate limit → (protected? auth) → forward + security headers
//! ```
//!
//! Classification runs on the canonical path and the request is forwarded
//! with that same path, so `/api/./settings` cannot reach the upstream as
//! anything but `/api/settings`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::GateSettings;
use crate::error::GateRejection;
use crate::observability::metrics;
use crate::routing::{canonical_uri, normalize_path, RouteClass, RoutePolicy};
use crate::security::access_control::{supplied_api_key, AuthMode, AuthOutcome};
use crate::security::clock::{Clock, SystemClock};
use crate::security::headers::{apply_security_headers, client_identifier};
use crate::security::rate_limit::{RateDecision, RateLimiter};

/// What the gate decided for an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Not subject to gating; response is left untouched.
    Bypass,
    /// Passed every check; response gets the security headers.
    Admitted,
}

/// Rate limiting and shared-secret checks for the API surface.
pub struct RequestGate {
    policy: RoutePolicy,
    auth: AuthMode,
    limiter: Arc<RateLimiter>,
}

impl RequestGate {
    pub fn new(policy: RoutePolicy, auth: AuthMode, limiter: Arc<RateLimiter>) -> Self {
        Self {
            policy,
            auth,
            limiter,
        }
    }

    pub fn from_settings(settings: &GateSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &GateSettings, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            RoutePolicy::from_settings(settings),
            AuthMode::from_secret(settings.api_key.clone()),
            Arc::new(RateLimiter::with_clock(
                settings.max_requests,
                settings.window(),
                clock,
            )),
        )
    }

    pub fn auth_mode(&self) -> &AuthMode {
        &self.auth
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Decide whether a request may be forwarded.
    pub fn evaluate(&self, uri: &Uri, headers: &HeaderMap) -> Result<Admission, GateRejection> {
        let path = normalize_path(uri.path()).map_err(|_| GateRejection::MalformedPath {
            path: uri.path().to_string(),
        })?;
        let path = path.as_str();
        let class = self.policy.classify(path);

        if matches!(class, RouteClass::Ungated | RouteClass::Public) {
            return Ok(Admission::Bypass);
        }

        let client = client_identifier(headers);
        if let RateDecision::Limited { retry_after } = self.limiter.check(&client) {
            tracing::warn!(client = %client, path = %path, "Rate limit exceeded");
            metrics::record_decision("rate_limited");
            return Err(GateRejection::RateLimited {
                client,
                retry_after,
            });
        }

        if class == RouteClass::Protected {
            let supplied = supplied_api_key(headers, uri);
            match self.auth.verify(supplied.as_deref()) {
                AuthOutcome::Granted => {}
                AuthOutcome::FailOpen => {
                    tracing::warn!(
                        client = %client,
                        path = %path,
                        "No API key configured, allowing protected route"
                    );
                    metrics::record_decision("fail_open");
                }
                AuthOutcome::Denied => {
                    tracing::warn!(
                        client = %client,
                        path = %path,
                        key_supplied = supplied.is_some(),
                        "Unauthorized request to protected route"
                    );
                    metrics::record_decision("unauthorized");
                    return Err(GateRejection::Unauthorized {
                        path: path.to_string(),
                    });
                }
            }
        }

        metrics::record_decision("admitted");
        Ok(Admission::Admitted)
    }
}

/// Axum middleware wrapping [`RequestGate::evaluate`].
pub async fn gate_middleware(
    State(gate): State<Arc<RequestGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match canonical_uri(request.uri()) {
        Ok(uri) => *request.uri_mut() = uri,
        Err(err) => {
            tracing::warn!(
                path = %request.uri().path(),
                error = %err,
                "Malformed request path"
            );
            metrics::record_decision("malformed_path");
            return GateRejection::MalformedPath {
                path: request.uri().path().to_string(),
            }
            .into_response();
        }
    }

    match gate.evaluate(request.uri(), request.headers()) {
        Ok(Admission::Bypass) => next.run(request).await,
        Ok(Admission::Admitted) => {
            let mut response = next.run(request).await;
            apply_security_headers(response.headers_mut());
            response
        }
        Err(rejection) => rejection.into_response(),
    }
}
