//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the shared secret for protected routes.
pub const API_KEY_ENV: &str = "DASHBOARD_API_KEY";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration.
///
/// With no path, defaults are used. The environment is consulted for the
/// shared secret in both cases.
pub fn load_config(path: Option<&Path>) -> Result<GateConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GateConfig::default(),
    };

    finalize(config, std::env::var(API_KEY_ENV).ok())
}

/// Apply the environment secret and validate.
pub fn finalize(
    mut config: GateConfig,
    env_secret: Option<String>,
) -> Result<GateConfig, ConfigError> {
    apply_secret_override(&mut config, env_secret);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// An env secret, when present and non-empty, replaces the file's.
fn apply_secret_override(config: &mut GateConfig, env_secret: Option<String>) {
    if let Some(secret) = env_secret.filter(|s| !s.is_empty()) {
        config.gate.api_key = Some(secret);
    }
}
