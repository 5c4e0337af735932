//! Path prefix matching.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex; a prefix matches whole path segments only, so `/api`
//!   covers `/api` and `/api/goals` but not `/apiary`
//! - A prefix ending in `/` matches anything below it
//! - An empty set never matches

/// A set of path prefixes.
#[derive(Debug, Clone, Default)]
pub struct PrefixSet {
    prefixes: Vec<String>,
}

impl PrefixSet {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if any prefix in the set covers `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| segment_prefix(p, path))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// True if `prefix` covers `path` on a segment boundary.
pub fn segment_prefix(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}
