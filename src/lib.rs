//! Request gate for the ops dashboard API.
//!
//! Sits in front of the dashboard application, rate limits API clients,
//! enforces a shared secret on sensitive routes and forwards the rest.

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GateConfig;
pub use error::GateRejection;
pub use http::middleware::RequestGate;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
