//! Location normalization for cache keys and importer targets.
//!
//! A canonical location is the WHATWG serialization of an absolute URL: scheme
//! and host lowercased, dot segments removed, default ports elided. Two
//! locations name the same document iff their fragment-stripped canonical
//! strings are equal.

use url::Url;

/// Error type for location normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("empty URI reference")]
    Empty,

    #[error("relative URI reference without a base: {0}")]
    Relative(String),

    #[error("invalid URI reference: {0}")]
    Invalid(String),
}

/// Returns the canonical absolute form of a URI reference.
///
/// `base` is required when `reference` is relative.
pub fn normalize(reference: &str, base: Option<&Url>) -> Result<Url, LocationError> {
    let trimmed = reference.trim();

    if trimmed.is_empty() {
        return Err(LocationError::Empty);
    }

    let parsed = match base {
        Some(base) => base.join(trimmed),
        None => Url::parse(trimmed),
    };

    parsed.map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => LocationError::Relative(trimmed.to_string()),
        other => LocationError::Invalid(format!("{trimmed}: {other}")),
    })
}

/// Answers whether the given URI is detected to have an abnormal form.
///
/// Detection is best effort: a URI that cannot be parsed at all is logged and
/// answered as normal.
pub fn is_abnormal(uri: &str) -> bool {
    match normalize(uri, None) {
        Ok(normal) => normal.as_str() != uri,
        Err(e) => {
            tracing::debug!("suppressed normalization failure for {}: {}", uri, e);
            false
        }
    }
}

/// Returns the same location without a fragment.
pub fn defragmented(location: &Url) -> Url {
    let mut location = location.clone();
    location.set_fragment(None);
    location
}

/// Splits a location into its fragment-free document location and its fragment identifier.
///
/// An empty fragment (`doc.html#`) counts as no fragment.
pub fn split_fragment(mut location: Url) -> (Url, Option<String>) {
    let fragment = location.fragment().filter(|f| !f.is_empty()).map(str::to_string);
    location.set_fragment(None);
    (location, fragment)
}

/// Whether the location is on the local filesystem rather than the network.
pub fn is_local(location: &Url) -> bool {
    location.scheme() == "file"
}
