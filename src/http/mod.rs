//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers)
//!     → request.rs (assign / propagate request ID)
//!     → middleware/gate.rs (rate limit, shared secret, security headers)
//!     → proxy.rs (forward to upstream dashboard)
//!     → Send to client
//! ```

pub mod middleware;
pub mod proxy;
pub mod request;
pub mod server;

pub use server::HttpServer;
