//! Title resolution for extracted links
//!
//! Newsletters bury the real article title in decorative markup around the
//! link. Each strategy below looks in one place and returns a candidate only
//! when it passes [`is_candidate_title`]; the first strategy with a candidate
//! wins.

use super::slug::{title_from_long_form_url, title_from_url};
use super::{selector, MIN_TITLE_LEN};
use scraper::ElementRef;
use url::Url;

/// How many ancestor levels are searched for headings
const MAX_ANCESTOR_LEVELS: usize = 5;

/// Heading-like elements searched around the anchor
const ANCESTOR_HEADINGS: &str = "h1, h2, h3, h4, strong";

/// Heading-like and emphasis elements searched inside the anchor
const DESCENDANT_TEXT: &str = "h1, h2, h3, h4, h5, strong, b, span, p";

/// Everything a strategy may look at
pub(crate) struct TitleContext<'a> {
    pub anchor: ElementRef<'a>,
    pub href: &'a str,
    pub url: &'a Url,
    pub long_form_hosts: &'a [String],
}

type Strategy = fn(&TitleContext<'_>) -> Option<String>;

/// Strategies in priority order
const STRATEGIES: &[(&str, Strategy)] = &[
    ("long-form slug", from_long_form_slug),
    ("ancestor heading", from_ancestor_headings),
    ("anchor text", from_anchor_text),
    ("anchor descendant", from_descendants),
    ("title attribute", from_title_attribute),
    ("image alt", from_image_alt),
    ("url slug", from_url_slug),
];

/// Resolves the title of a link, falling back to the raw href
pub(crate) fn resolve_title(ctx: &TitleContext<'_>) -> String {
    for (name, strategy) in STRATEGIES {
        if let Some(title) = strategy(ctx) {
            tracing::trace!("Title for {} from {}: {}", ctx.href, name, title);
            return title;
        }
    }

    ctx.href.to_string()
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns true if a piece of text can serve as a title for `href`
///
/// The text must be non-empty, differ from the href, not be a URL itself,
/// have at least three characters and contain a letter (any non-ASCII
/// character counts as one).
pub fn is_candidate_title(text: &str, href: &str) -> bool {
    if text.is_empty() || text == href {
        return false;
    }

    if text.starts_with("http://") || text.starts_with("https://") {
        return false;
    }

    if text.chars().count() < 3 {
        return false;
    }

    text.chars().any(|c| c.is_ascii_alphabetic() || !c.is_ascii())
}

/// Returns true if a resolved title is good enough to keep the link
///
/// # Examples
///
/// ```
/// use mailsift::extract::is_valid_title;
///
/// assert!(is_valid_title("Twenty Chars Exactly"));
/// assert!(!is_valid_title("twenty chars exactly"));
/// assert!(!is_valid_title("Nineteen Characters"));
/// ```
pub fn is_valid_title(title: &str) -> bool {
    if title.chars().count() < MIN_TITLE_LEN {
        return false;
    }

    title.chars().next().is_some_and(char::is_uppercase)
}

fn candidate(text: &str, href: &str) -> Option<String> {
    let cleaned = clean_text(text);
    is_candidate_title(&cleaned, href).then_some(cleaned)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn from_long_form_slug(ctx: &TitleContext<'_>) -> Option<String> {
    let host = ctx.url.host_str()?;
    if !ctx
        .long_form_hosts
        .iter()
        .any(|long_form| host.contains(long_form.as_str()))
    {
        return None;
    }

    candidate(&title_from_long_form_url(ctx.url), ctx.href)
}

/// Searches up to five ancestors; the longest heading of the closest level wins
fn from_ancestor_headings(ctx: &TitleContext<'_>) -> Option<String> {
    let headings = selector(ANCESTOR_HEADINGS)?;
    let mut level = ctx.anchor.parent().and_then(ElementRef::wrap);

    for _ in 0..MAX_ANCESTOR_LEVELS {
        let ancestor = level?;

        let mut best: Option<String> = None;
        for heading in ancestor.select(&headings) {
            if heading.id() == ancestor.id() {
                continue;
            }
            if let Some(text) = candidate(&element_text(heading), ctx.href) {
                let longer = best
                    .as_ref()
                    .map_or(true, |b| text.chars().count() > b.chars().count());
                if longer {
                    best = Some(text);
                }
            }
        }

        if best.is_some() {
            return best;
        }

        level = ancestor.parent().and_then(ElementRef::wrap);
    }

    None
}

fn from_anchor_text(ctx: &TitleContext<'_>) -> Option<String> {
    candidate(&element_text(ctx.anchor), ctx.href)
}

fn from_descendants(ctx: &TitleContext<'_>) -> Option<String> {
    let inner = selector(DESCENDANT_TEXT)?;
    ctx.anchor
        .select(&inner)
        .find_map(|child| candidate(&element_text(child), ctx.href))
}

fn from_title_attribute(ctx: &TitleContext<'_>) -> Option<String> {
    candidate(ctx.anchor.value().attr("title")?, ctx.href)
}

fn from_image_alt(ctx: &TitleContext<'_>) -> Option<String> {
    let img = selector("img")?;
    let alt = ctx.anchor.select(&img).next()?.value().attr("alt")?;
    candidate(alt, ctx.href)
}

fn from_url_slug(ctx: &TitleContext<'_>) -> Option<String> {
    candidate(&title_from_url(ctx.url), ctx.href)
}
