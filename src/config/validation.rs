//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, ceiling > 0)
//! - Check that addresses parse and route prefixes are absolute
//! - Upstream may be a host name; listeners must be socket addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::{GateConfig, PLACEHOLDER_ADMIN_KEY};

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: route prefix '{value}' must start with '/'")]
    RelativePrefix { field: &'static str, value: String },

    #[error("gate.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("gate.max_requests must be greater than zero")]
    ZeroCeiling,

    #[error("gate.api_key is set but empty")]
    EmptySecret,

    #[error("admin.api_key must be changed before enabling the admin endpoints")]
    PlaceholderAdminKey,
}

/// Check every semantic rule and collect all failures.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.upstream.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "upstream.address",
            value: config.upstream.address.clone(),
        });
    }

    check_prefix(&mut errors, "gate.api_prefix", &config.gate.api_prefix);
    for prefix in &config.gate.public_routes {
        check_prefix(&mut errors, "gate.public_routes", prefix);
    }
    for prefix in &config.gate.protected_routes {
        check_prefix(&mut errors, "gate.protected_routes", prefix);
    }

    if config.gate.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.gate.max_requests == 0 {
        errors.push(ValidationError::ZeroCeiling);
    }
    if matches!(config.gate.api_key.as_deref(), Some("")) {
        errors.push(ValidationError::EmptySecret);
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::PlaceholderAdminKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_prefix(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::RelativePrefix {
            field,
            value: value.to_string(),
        });
    }
}
