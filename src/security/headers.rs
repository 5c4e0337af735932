//! Client identification and security response headers.
//!
//! # Responsibilities
//! - Derive the rate-limit identifier from forwarding headers
//! - Attach baseline security headers to admitted responses
//!
//! # Design Decisions
//! - Identifier is best effort: first X-Forwarded-For entry, then
//!   X-Real-IP, then a shared "unknown" bucket
//! - Security headers are static and only set on the success path

use axum::http::header::{
    HeaderName, HeaderValue, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS, X_XSS_PROTECTION,
};
use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Identifier used when no address header is present.
pub const UNKNOWN_CLIENT: &str = "unknown";

pub const SECURITY_HEADERS: [(HeaderName, &str); 3] = [
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (X_FRAME_OPTIONS, "DENY"),
    (X_XSS_PROTECTION, "1; mode=block"),
];

/// Best-effort client address for rate limiting.
pub fn client_identifier(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let real_ip = || {
        headers
            .get(X_REAL_IP)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}
