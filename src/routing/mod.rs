//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → normalize.rs (canonical path; malformed paths are refused)
//!     → policy.rs (API prefix, then public, then protected)
//!     → matcher.rs (segment-aware prefix set evaluation)
//!     → Return: RouteClass
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path always gets the same class

pub mod matcher;
pub mod normalize;
pub mod policy;

pub use matcher::PrefixSet;
pub use normalize::{canonical_uri, normalize_path, PathError};
pub use policy::{RouteClass, RoutePolicy};
