//! Link extraction from newsletter HTML
//!
//! This module turns an email body into the set of article links it carries:
//! - Boilerplate links (unsubscribe, share buttons, anchors) are filtered out
//! - URLs are normalized into their canonical form and deduplicated
//! - A human-readable title is resolved through a chain of strategies
//! - Links whose title fails the validity gate are dropped
//!
//! Extraction is a pure function of the input: no I/O, no shared state.

mod slug;
mod title;

pub use slug::{title_from_long_form_url, title_from_url};
pub use title::{clean_text, is_candidate_title, is_valid_title};

use crate::url::{extract_domain, is_ignorable_link, normalize_parsed, parse_http_url};
use crate::url::{IGNORED_PATTERNS, TRACKING_PARAMS};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Minimum number of characters in an accepted title
pub const MIN_TITLE_LEN: usize = 20;

/// Titles longer than this are truncated
pub const MAX_TITLE_LEN: usize = 200;

/// Descriptions longer than this are truncated
pub const MAX_DESCRIPTION_LEN: usize = 300;

/// Hosts whose URL slug is the most reliable title source
pub const LONG_FORM_HOSTS: &[&str] = &["medium.com"];

/// A candidate article link found in an email body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Canonical URL, the deduplication key
    pub url: String,

    /// Human-readable title (at least 20 characters, starts uppercase)
    pub title: String,

    /// Text of the paragraph following the link block, possibly empty
    pub description: String,

    /// Hostname of the link
    pub domain: String,

    /// Order of appearance among the emitted links
    pub position: usize,
}

/// Tunable heuristic tables used by the extractor
///
/// The lists are product decisions rather than principled rules, so they live
/// in configuration and default to the built-in tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRules {
    /// Query parameters stripped during normalization
    pub tracking_params: Vec<String>,

    /// Case-insensitive substrings that disqualify an href
    pub ignore_patterns: Vec<String>,

    /// Hosts (matched as substrings) whose slug yields the title
    pub long_form_hosts: Vec<String>,
}

impl Default for ExtractRules {
    fn default() -> Self {
        Self {
            tracking_params: to_owned_list(TRACKING_PARAMS),
            ignore_patterns: to_owned_list(IGNORED_PATTERNS),
            long_form_hosts: to_owned_list(LONG_FORM_HOSTS),
        }
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Extracts article links from HTML according to a set of rules
#[derive(Debug, Clone, Default)]
pub struct LinkExtractor {
    rules: ExtractRules,
}

impl LinkExtractor {
    /// Creates an extractor with the given rules
    pub fn new(rules: ExtractRules) -> Self {
        Self { rules }
    }

    /// Extracts the article links of an HTML body, in document order
    ///
    /// The HTML parser is lenient: malformed markup yields whatever anchors
    /// survive parsing and never an error. Plain text yields no links.
    ///
    /// # Example
    ///
    /// ```
    /// use mailsift::extract::LinkExtractor;
    ///
    /// let html = r#"<div><h2>Understanding Async Rust In Depth</h2>
    ///     <a href="https://blog.example.com/async?utm_source=weekly">Read</a></div>"#;
    /// let links = LinkExtractor::default().extract(html);
    /// assert_eq!(links.len(), 1);
    /// assert_eq!(links[0].url, "https://blog.example.com/async");
    /// assert_eq!(links[0].title, "Understanding Async Rust In Depth");
    /// ```
    pub fn extract(&self, html: &str) -> Vec<ExtractedLink> {
        let document = Html::parse_document(html);
        let Some(anchors) = selector("a[href]") else {
            return Vec::new();
        };

        let mut links = Vec::new();
        let mut seen = HashSet::new();

        for anchor in document.select(&anchors) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };

            if href.is_empty() || is_ignorable_link(href, &self.rules.ignore_patterns) {
                continue;
            }

            let parsed = match parse_http_url(href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::trace!("Skipping link {}: {}", href, e);
                    continue;
                }
            };

            let url = normalize_parsed(&parsed, &self.rules.tracking_params);
            if !seen.insert(url.clone()) {
                continue;
            }

            let title = title::resolve_title(&title::TitleContext {
                anchor,
                href,
                url: &parsed,
                long_form_hosts: &self.rules.long_form_hosts,
            });

            if !is_valid_title(&title) {
                tracing::trace!("Dropping {}: no usable title", url);
                continue;
            }

            let domain = extract_domain(&url).unwrap_or_default();
            links.push(ExtractedLink {
                url,
                title: truncate(&title, MAX_TITLE_LEN),
                description: description_for(anchor),
                domain,
                position: links.len(),
            });
        }

        tracing::debug!("Extracted {} links", links.len());
        links
    }
}

/// Extracts article links with the default rules
///
/// # Arguments
///
/// * `html` - The email body
///
/// # Returns
///
/// The accepted links in order of first appearance
pub fn extract_links(html: &str) -> Vec<ExtractedLink> {
    LinkExtractor::default().extract(html)
}

/// Parses a CSS selector, returning None for an invalid one
pub(crate) fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Uses the paragraph right after the link's block as a description
fn description_for(anchor: ElementRef<'_>) -> String {
    let Some(parent) = anchor.parent().and_then(ElementRef::wrap) else {
        return String::new();
    };

    match parent.next_siblings().find_map(ElementRef::wrap) {
        Some(next) if next.value().name() == "p" => {
            let text = next.text().collect::<String>();
            truncate(text.trim(), MAX_DESCRIPTION_LEN)
        }
        _ => String::new(),
    }
}

/// Truncates to `max` characters, marking the cut with an ellipsis
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}
