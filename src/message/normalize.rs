//! Body selection for raw messages
//!
//! Newsletters usually arrive as `multipart/alternative` with an HTML and a
//! plain-text rendition. The HTML rendition carries the markup the link
//! extractor relies on, so it is preferred.

use crate::extract::{ExtractedLink, LinkExtractor};
use mailparse::ParsedMail;

/// The readable text of a message and the links found in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBody {
    pub text: String,
    pub links: Vec<ExtractedLink>,
}

/// Picks the readable body of a raw message and extracts its links
///
/// Never fails: anything that cannot be parsed or decoded degrades to the
/// raw bytes, which are then scanned as they are.
///
/// # Example
///
/// ```
/// use mailsift::extract::LinkExtractor;
/// use mailsift::message::normalize_body;
///
/// let raw = b"Content-Type: text/plain\r\n\r\nNothing to see here";
/// let body = normalize_body(raw, &LinkExtractor::default());
/// assert_eq!(body.text, "Nothing to see here");
/// assert!(body.links.is_empty());
/// ```
pub fn normalize_body(raw: &[u8], extractor: &LinkExtractor) -> NormalizedBody {
    let text = select_text(raw).unwrap_or_else(|| String::from_utf8_lossy(raw).into_owned());
    let links = extractor.extract(&text);
    NormalizedBody { text, links }
}

/// Returns the decoded text of the preferred part, if any
fn select_text(raw: &[u8]) -> Option<String> {
    let parsed = match mailparse::parse_mail(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Message is not valid MIME, using raw bytes: {}", e);
            return None;
        }
    };

    let mut leaves = Vec::new();
    collect_leaves(&parsed, &mut leaves);

    first_body(&leaves, "text/html").or_else(|| first_body(&leaves, "text/plain"))
}

/// Collects the non-multipart parts of an entity, depth first
fn collect_leaves<'p, 'a>(part: &'p ParsedMail<'a>, leaves: &mut Vec<&'p ParsedMail<'a>>) {
    if part.subparts.is_empty() {
        leaves.push(part);
        return;
    }

    for sub in &part.subparts {
        collect_leaves(sub, leaves);
    }
}

fn first_body(leaves: &[&ParsedMail<'_>], mimetype: &str) -> Option<String> {
    leaves
        .iter()
        .filter(|part| part.ctype.mimetype.eq_ignore_ascii_case(mimetype))
        .find_map(|part| match part.get_body() {
            Ok(body) if !body.is_empty() => Some(body),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Failed to decode {} part: {}", mimetype, e);
                None
            }
        })
}
