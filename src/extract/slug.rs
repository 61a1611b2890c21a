//! Titles derived from URL path slugs

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Trailing id or hash appended to a slug, e.g. `-3f9a2b1c`
static HEX_ID_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_][a-f0-9]{8,}$").expect("hex id pattern is valid"));

/// Long-form platforms append an id of up to twelve characters after the last hyphen
const LONG_FORM_ID_LEN: usize = 13;

/// Slugs shorter than this are assumed to be ids rather than titles
const MIN_LONG_FORM_SLUG_LEN: usize = 10;

/// Derives a title from a long-form article URL
///
/// These platforms use paths like `/@author/the-article-title-3f9a2b1c4d5e`
/// or `/p/3f9a2b1c4d5e`. The trailing id is removed and the remaining words
/// are capitalized.
///
/// # Examples
///
/// ```
/// use mailsift::extract::title_from_long_form_url;
/// use url::Url;
///
/// let url = Url::parse("https://medium.com/@me/rust-at-scale-1a2b3c4d5e6f").unwrap();
/// assert_eq!(title_from_long_form_url(&url), "Rust At Scale");
/// ```
pub fn title_from_long_form_url(url: &Url) -> String {
    let path = trim_slashes(url.path());
    let parts: Vec<&str> = path.split('/').collect();

    let mut slug = parts.last().copied().unwrap_or_default();
    if (slug == "p" || slug.chars().count() < MIN_LONG_FORM_SLUG_LEN) && parts.len() > 1 {
        slug = parts[parts.len() - 2];
    }

    if let Some(idx) = slug.rfind('-') {
        if idx > 0 && slug.len() - idx <= LONG_FORM_ID_LEN {
            slug = &slug[..idx];
        }
    }

    slug.split('-').map(capitalize).collect::<Vec<_>>().join(" ")
}

/// Derives a readable title from the last path segment of any URL
///
/// The file extension and a trailing hex id are removed, separators become
/// spaces and every word is capitalized. An empty path yields the host.
///
/// # Examples
///
/// ```
/// use mailsift::extract::title_from_url;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/blog/zero_copy-parsing.html").unwrap();
/// assert_eq!(title_from_url(&url), "Zero Copy Parsing");
///
/// let url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(title_from_url(&url), "example.com");
/// ```
pub fn title_from_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let path = trim_slashes(url.path());

    if path.is_empty() {
        return host.to_string();
    }

    let mut slug = path.rsplit('/').next().unwrap_or(path);
    if let Some(idx) = slug.rfind('.') {
        if idx > 0 {
            slug = &slug[..idx];
        }
    }

    let slug = HEX_ID_SUFFIX.replace(slug, "");
    let title = slug
        .replace(&['-', '_'][..], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        host.to_string()
    } else {
        title
    }
}

fn trim_slashes(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Uppercases the first character and lowercases the rest
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
