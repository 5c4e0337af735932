//! Path canonicalization.
//!
//! The gate classifies and forwards the same canonical path, so every
//! spelling the upstream would resolve to `/api/settings` is classified as
//! `/api/settings`.
//!
//! # Rules
//! - Percent-encoded unreserved characters are decoded; other escapes are
//!   kept with uppercase hex
//! - Runs of `/` collapse to one
//! - `.` and `..` segments are resolved (RFC 3986 §5.2.4); `..` never
//!   climbs above the root
//! - Encoded `/`, `\` and NUL are refused, as are malformed escapes

use axum::http::uri::{InvalidUriParts, PathAndQuery, Uri};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("malformed percent escape in path")]
    MalformedEscape,

    #[error("path contains a forbidden encoded byte %{0:02X}")]
    ForbiddenEscape(u8),

    #[error("path is not absolute")]
    NotAbsolute,
}

/// Canonical form of `raw`.
pub fn normalize_path(raw: &str) -> Result<String, PathError> {
    if !raw.starts_with('/') {
        return Err(PathError::NotAbsolute);
    }

    let decoded = decode_unreserved(raw)?;

    let mut segments: Vec<&str> = Vec::new();
    let mut parts = decoded.split('/').skip(1).filter(|s| !s.is_empty()).peekable();
    let mut trailing_slash = decoded.ends_with('/');

    while let Some(segment) = parts.next() {
        let last = parts.peek().is_none();
        match segment {
            "." => trailing_slash |= last,
            ".." => {
                segments.pop();
                trailing_slash |= last;
            }
            _ => segments.push(segment),
        }
    }

    let mut path = String::with_capacity(decoded.len());
    for segment in &segments {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() || trailing_slash {
        path.push('/');
    }
    Ok(path)
}

/// `uri` with its path replaced by the canonical path; the query is kept.
pub fn canonical_uri(uri: &Uri) -> Result<Uri, CanonicalUriError> {
    let path = normalize_path(uri.path())?;
    if path == uri.path() {
        return Ok(uri.clone());
    }

    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query).map_err(|_| PathError::MalformedEscape)?,
    );
    Ok(Uri::from_parts(parts)?)
}

#[derive(Debug, Error)]
pub enum CanonicalUriError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("failed to rebuild uri: {0}")]
    Uri(#[from] InvalidUriParts),
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn decode_unreserved(raw: &str) -> Result<String, PathError> {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            if bytes[i] == b'\\' {
                return Err(PathError::ForbiddenEscape(b'\\'));
            }
            out.push(bytes[i] as char);
            i += 1;
            continue;
        }

        let (hi, lo) = match (bytes.get(i + 1), bytes.get(i + 2)) {
            (Some(&h), Some(&l)) => (h, l),
            _ => return Err(PathError::MalformedEscape),
        };
        let value = match (hex_value(hi), hex_value(lo)) {
            (Some(h), Some(l)) => h * 16 + l,
            _ => return Err(PathError::MalformedEscape),
        };

        match value {
            b'/' | b'\\' | 0 => return Err(PathError::ForbiddenEscape(value)),
            v if is_unreserved(v) => out.push(v as char),
            v => out.push_str(&format!("%{:02X}", v)),
        }
        i += 3;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_paths_unchanged() {
        for path in ["/", "/api", "/api/settings", "/api/goals/42", "/api/settings/"] {
            assert_eq!(normalize_path(path).unwrap(), path);
        }
    }

    #[test]
    fn test_alternate_spellings_resolve() {
        for path in [
            "/api/./settings",
            "/api//settings",
            "/api/x/../settings",
            "/api/%73ettings",
            "/api/%2e/settings",
            "//api///settings",
            "/../api/settings",
        ] {
            assert_eq!(normalize_path(path).unwrap(), "/api/settings", "{}", path);
        }
    }

    #[test]
    fn test_dot_segments_escape_public_prefix() {
        assert_eq!(normalize_path("/api/health/../goals").unwrap(), "/api/goals");
        assert_eq!(normalize_path("/api/health/%2E%2E/goals").unwrap(), "/api/goals");
    }

    #[test]
    fn test_trailing_dot_segments_keep_directory_form() {
        assert_eq!(normalize_path("/api/settings/.").unwrap(), "/api/settings/");
        assert_eq!(normalize_path("/api/x/..").unwrap(), "/api/");
        assert_eq!(normalize_path("/..").unwrap(), "/");
    }

    #[test]
    fn test_reserved_escapes_kept_uppercase() {
        assert_eq!(normalize_path("/api/a%3bb").unwrap(), "/api/a%3Bb");
        assert_eq!(normalize_path("/api/a%20b").unwrap(), "/api/a%20b");
    }

    #[test]
    fn test_rejects_unsafe_paths() {
        assert_eq!(
            normalize_path("/api%2Fsettings"),
            Err(PathError::ForbiddenEscape(b'/'))
        );
        assert_eq!(
            normalize_path("/api%5csettings"),
            Err(PathError::ForbiddenEscape(b'\\'))
        );
        assert_eq!(normalize_path("/api/%00"), Err(PathError::ForbiddenEscape(0)));
        assert_eq!(normalize_path("/api/%zz"), Err(PathError::MalformedEscape));
        assert_eq!(normalize_path("/api/%7"), Err(PathError::MalformedEscape));
        assert_eq!(normalize_path("api/settings"), Err(PathError::NotAbsolute));
    }

    #[test]
    fn test_canonical_uri_keeps_query() {
        let uri: Uri = "/api//./settings?tab=keys&api_key=abc".parse().unwrap();
        let canonical = canonical_uri(&uri).unwrap();
        assert_eq!(canonical.path(), "/api/settings");
        assert_eq!(canonical.query(), Some("tab=keys&api_key=abc"));
    }
}
