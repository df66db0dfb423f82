use url::Url;

use crate::config::constants::UNKNOWN;

// * Resolves a listing href into an absolute detail URL.
// *
// * Logic:
// * 1. Parse the site's base origin.
// * 2. Join href onto it (absolute hrefs pass through unchanged).
// * 3. Only http(s) results count; javascript:/mailto: links are rejected.
pub fn resolve_href(href: &str, base_origin: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let base = Url::parse(base_origin).ok()?;
    let url = base.join(href).ok()?;

    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}

// * Computes the identity key used by the deduplicator.
// *
// * Scheme and host are lowercased (the url crate does this on parse);
// * path, query and fragment are kept as given. Returns None for the
// * "unknown" sentinel, which never has an identity.
pub fn identity_key(detail_url: &str) -> Option<String> {
    let trimmed = detail_url.trim();
    if trimmed.is_empty() || trimmed == UNKNOWN {
        return None;
    }

    match Url::parse(trimmed) {
        Ok(url) => Some(url.to_string()),
        // ? Unparseable but non-empty: fall back to the raw text so identical
        // ? strings still collapse.
        Err(_) => Some(trimmed.to_string()),
    }
}
