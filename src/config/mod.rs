//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, DASHBOARD_API_KEY override)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → shared with all subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, GateConfig, GateSettings, LimitsConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig, UpstreamConfig,
};
