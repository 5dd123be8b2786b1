//! Creator handle extraction
//!
//! Storefront URLs follow the `https://{handle}.{storefront}/{slug}` shape.
//! The handle is the creator's unique name; the storefront apex and service
//! subdomains (`www`, `static`, ...) are not handles.

use url::Url;

/// Subdomains that are never creator handles
const RESERVED_SUBDOMAINS: &[&str] = &["www", "static", "api", "cdn"];

/// Extracts the creator handle from an item or profile URL.
///
/// Returns `None` for unrecognized shapes (apex domain, reserved subdomain,
/// bare IP) rather than collapsing them into a junk handle.
pub fn extract_handle(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();

    // Need at least {handle}.{domain}.{tld}
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 3 {
        return None;
    }

    let handle = parts[0];
    if handle.is_empty() || RESERVED_SUBDOMAINS.contains(&handle) {
        return None;
    }

    // Reject numeric hosts (IP addresses)
    if parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }

    Some(handle.to_string())
}

/// Derives the canonical profile URL for the creator owning `item_url`:
/// the scheme + host root of the item URL.
pub fn profile_url_for(item_url: &Url) -> Option<Url> {
    let host = item_url.host_str()?;
    Url::parse(&format!("{}://{}/", item_url.scheme(), host)).ok()
}
