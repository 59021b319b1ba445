//! Public Suffix List (PSL) grouping for cookie statistics.
//!
//! Cookies set by `a.example.com`, `.example.com` and `b.example.com` all
//! belong to the site `example.com`. Uses Mozilla's Public Suffix List via the
//! `psl` crate.

use crate::cookies::canonicalcookie::display_domain;

/// Get the registrable domain (eTLD+1) for a domain.
/// For "sub.example.com", returns "example.com".
/// For "example.com", returns "example.com".
/// For "com" (public suffix), returns None.
pub fn registrable_domain(domain: &str) -> Option<String> {
    let domain_lower = domain.to_lowercase();
    psl::domain(domain_lower.as_bytes())
        .and_then(|d| std::str::from_utf8(d.as_bytes()).ok())
        .map(|s| s.to_string())
}

/// Site a cookie domain is counted under: its registrable domain, or the
/// display domain itself when the PSL has no answer (IP literals, `localhost`).
pub fn site_for(cookie_domain: &str) -> String {
    let host = display_domain(cookie_domain);
    registrable_domain(host).unwrap_or_else(|| host.to_lowercase())
}
