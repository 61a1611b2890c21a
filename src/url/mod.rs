//! URL handling module for Mailsift
//!
//! This module provides canonical URL normalization, ignore-list filtering
//! of newsletter boilerplate links, and domain extraction.

mod filter;
mod normalize;

pub use filter::{is_ignorable_link, parse_http_url, IGNORED_PATTERNS};
pub use normalize::{normalize_parsed, normalize_url, TRACKING_PARAMS};

use url::Url;

/// Extracts the hostname component of a link
///
/// Returns `None` when the link does not parse or has no host.
///
/// # Examples
///
/// ```
/// use mailsift::url::extract_domain;
///
/// assert_eq!(
///     extract_domain("https://Blog.Example.com:8080/post"),
///     Some("blog.example.com".to_string())
/// );
/// assert_eq!(extract_domain("not a url"), None);
/// ```
pub fn extract_domain(href: &str) -> Option<String> {
    Url::parse(href)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
}
