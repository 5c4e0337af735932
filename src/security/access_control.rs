//! Shared-secret access control for protected routes.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{HeaderMap, Uri};
use subtle::ConstantTimeEq;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Query parameter accepted when the header is absent.
pub const API_KEY_QUERY_PARAM: &str = "api_key";

/// How protected routes are authenticated.
///
/// `Disabled` is the personal-deployment default: with no secret configured
/// protected routes are forwarded with a warning instead of rejected.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    Disabled,
    SharedSecret(String),
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::Disabled => f.write_str("Disabled"),
            AuthMode::SharedSecret(_) => f.write_str("SharedSecret(..)"),
        }
    }
}

/// Result of checking a credential against the configured mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Key matched the secret.
    Granted,
    /// No secret configured; let it through.
    FailOpen,
    /// Key absent or wrong.
    Denied,
}

impl AuthMode {
    pub fn from_secret(secret: Option<String>) -> Self {
        match secret {
            Some(secret) if !secret.is_empty() => AuthMode::SharedSecret(secret),
            _ => AuthMode::Disabled,
        }
    }

    pub fn require_auth(&self) -> bool {
        matches!(self, AuthMode::SharedSecret(_))
    }

    /// Label used in logs and the admin status endpoint.
    pub fn label(&self) -> &'static str {
        match self {
            AuthMode::Disabled => "fail_open",
            AuthMode::SharedSecret(_) => "shared_secret",
        }
    }

    pub fn verify(&self, supplied: Option<&str>) -> AuthOutcome {
        match self {
            AuthMode::Disabled => AuthOutcome::FailOpen,
            AuthMode::SharedSecret(secret) => match supplied {
                Some(key) if bool::from(key.as_bytes().ct_eq(secret.as_bytes())) => {
                    AuthOutcome::Granted
                }
                _ => AuthOutcome::Denied,
            },
        }
    }
}

/// Pull the API key from the `x-api-key` header, falling back to the
/// `api_key` query parameter.
pub fn supplied_api_key(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(value) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }

    Query::<HashMap<String, String>>::try_from_uri(uri)
        .ok()
        .and_then(|Query(mut params)| params.remove(API_KEY_QUERY_PARAM))
}
