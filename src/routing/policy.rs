//! Route classification.
//!
//! Public routes are checked before protected ones, so a prefix listed in
//! both is treated as public.

use crate::config::GateSettings;
use crate::routing::matcher::PrefixSet;

/// How the gate treats a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Outside the API prefix.
    Ungated,
    /// Exempt from rate limiting and authentication.
    Public,
    /// Rate limited only.
    Standard,
    /// Rate limited and, when a secret is set, authenticated.
    Protected,
}

/// Immutable route rules compiled at startup.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    api_prefix: PrefixSet,
    public: PrefixSet,
    protected: PrefixSet,
}

impl RoutePolicy {
    pub fn new(api_prefix: impl Into<String>, public: PrefixSet, protected: PrefixSet) -> Self {
        Self {
            api_prefix: PrefixSet::new([api_prefix.into()]),
            public,
            protected,
        }
    }

    pub fn from_settings(settings: &GateSettings) -> Self {
        Self::new(
            settings.api_prefix.clone(),
            PrefixSet::new(settings.public_routes.iter().cloned()),
            PrefixSet::new(settings.protected_routes.iter().cloned()),
        )
    }

    /// Classify a canonical path (see [`normalize_path`](super::normalize_path)).
    pub fn classify(&self, path: &str) -> RouteClass {
        if !self.api_prefix.matches(path) {
            RouteClass::Ungated
        } else if self.public.matches(path) {
            RouteClass::Public
        } else if self.protected.matches(path) {
            RouteClass::Protected
        } else {
            RouteClass::Standard
        }
    }
}
