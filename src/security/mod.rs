//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Gated request:
//!     → headers.rs (derive client identifier)
//!     → rate_limit.rs (check per-identifier window)
//!     → access_control.rs (shared secret on protected routes)
//!     → forwarded; headers.rs adds security response headers
//! ```
//!
//! # Design Decisions
//! - Rate table is owned by the gate instance, never a global
//! - Time is injected through clock.rs so windows are testable
//! - Fail open on protected routes only when no secret is configured

pub mod access_control;
pub mod clock;
pub mod headers;
pub mod rate_limit;

pub use access_control::{AuthMode, AuthOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use rate_limit::{RateDecision, RateLimiter, RatePruner};
