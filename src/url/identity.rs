//! Item identity derivation
//!
//! An item's identity is the SHA-256 of its normalized canonical URL. The
//! storefront's human-readable slugs are NOT unique across creators (two
//! creators can both publish `cool-game`), so the slug is retained only as a
//! display attribute and the hashed URL is the lookup key everywhere.

use crate::url::normalize::{normalize_url, resolve_url};
use crate::UrlResult;
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Globally unique, content-derived identity for an item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentity(String);

impl ItemIdentity {
    /// Derives the identity of an already-normalized URL.
    pub fn of(url: &Url) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps a stored identity string (e.g. read back from the database).
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolves an href found on `base` to its canonical URL and identity.
///
/// Equivalent spellings (relative vs. absolute, tracking params, case in the
/// host) of the same resource yield the same identity.
pub fn resolve_identity(base: &Url, href: &str) -> UrlResult<(Url, ItemIdentity)> {
    let url = resolve_url(base, href)?;
    let identity = ItemIdentity::of(&url);
    Ok((url, identity))
}

/// Derives the identity of an absolute URL string.
pub fn identity_of(url_str: &str) -> UrlResult<(Url, ItemIdentity)> {
    let url = normalize_url(url_str)?;
    let identity = ItemIdentity::of(&url);
    Ok((url, identity))
}
