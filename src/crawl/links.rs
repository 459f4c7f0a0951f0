// src/crawl/links.rs
// =============================================================================
// Turns the raw href values found on a page into absolute, crawlable URLs.
//
// Rules:
// - mailto:, tel: and javascript: links are dropped
// - relative links are resolved against the page URL (like a browser does)
// - the #fragment is stripped, /page#a and /page#b are the same page
// - only http and https survive
// =============================================================================

use url::Url;

// Resolves a link (possibly relative) to an absolute URL without fragment
//
// Examples:
//   base = "https://example.com/page/"
//   href = "/docs"               -> Some("https://example.com/docs")
//   href = "../other#top"        -> Some("https://example.com/other")
//   href = "mailto:a@b.nl"       -> None
//   href = "ftp://example.com/x" -> None (not HTTP)
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || has_rejected_scheme(href) {
        return None;
    }

    let mut absolute = base.join(href).ok()?;
    if !matches!(absolute.scheme(), "http" | "https") {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute)
}

// Whether a resolved URL shares scheme, host and port with the crawl origin
pub fn is_same_origin(origin: &url::Origin, candidate: &Url) -> bool {
    &candidate.origin() == origin
}

fn has_rejected_scheme(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    ["mailto:", "tel:", "javascript:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
