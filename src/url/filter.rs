//! Ignore-list filtering for newsletter links
//!
//! Newsletters are full of links that never lead to an article: unsubscribe
//! and preference centers, share buttons, messaging deep links. These are
//! dropped before any further processing.

use crate::UrlError;
use url::Url;

/// Substrings that mark a link as boilerplate (matched case-insensitively)
pub const IGNORED_PATTERNS: &[&str] = &[
    "unsubscribe",
    "preferences",
    "mailto:",
    "tel:",
    "facebook.com/sharer",
    "twitter.com/intent",
    "twitter.com/share",
    "linkedin.com/sharing",
    "linkedin.com/sharearticle",
    "pinterest.com/pin",
    "reddit.com/submit",
    "wa.me",
    "whatsapp.com",
    "t.me",
];

/// Minimum length of an href worth looking at
const MIN_HREF_LEN: usize = 10;

/// Returns true if the href should be discarded before normalization
///
/// A link is ignorable when it is a same-document anchor, is shorter than
/// ten characters, or contains any of the given patterns.
pub fn is_ignorable_link<S: AsRef<str>>(href: &str, patterns: &[S]) -> bool {
    if href.starts_with('#') {
        return true;
    }

    if href.chars().count() < MIN_HREF_LEN {
        return true;
    }

    let lower = href.to_lowercase();
    patterns
        .iter()
        .any(|pattern| lower.contains(&pattern.as_ref().to_lowercase()))
}

/// Parses an href, accepting only http and https URLs with a host
///
/// Hrefs with a leading space or any ASCII control character are rejected
/// rather than silently stripped.
pub fn parse_http_url(href: &str) -> Result<Url, UrlError> {
    if href.starts_with(' ') || href.contains(|c: char| c.is_ascii_control()) {
        return Err(UrlError::Parse(format!("stray whitespace in {:?}", href)));
    }

    let url = Url::parse(href).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
