//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Placeholder admin key; validation refuses to start the admin listener with it.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the request gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dashboard application that admitted requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Rate limiting and authentication rules.
    pub gate: GateSettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream dashboard application.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Gate rules: which routes are gated, how hard, and with what secret.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateSettings {
    /// Path prefix of the API surface. Everything else passes through.
    pub api_prefix: String,

    /// Prefixes exempt from both rate limiting and authentication.
    pub public_routes: Vec<String>,

    /// Prefixes that require the shared secret when one is configured.
    pub protected_routes: Vec<String>,

    /// Rate limit window length in seconds.
    pub window_secs: u64,

    /// Requests admitted per identifier per window.
    pub max_requests: u32,

    /// How often expired rate records are pruned. 0 disables pruning.
    pub prune_interval_secs: u64,

    /// Shared secret for protected routes. Unset means protected routes
    /// fail open. Overridden by `DASHBOARD_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl GateSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            public_routes: vec!["/api/health".to_string()],
            protected_routes: vec!["/api/settings".to_string()],
            window_secs: 60,
            max_requests: 100,
            prune_interval_secs: 300,
            api_key: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin endpoints.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
