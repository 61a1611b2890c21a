//! Message normalization
//!
//! Turns raw messages fetched from a folder into [`NormalizedMessage`]
//! values: envelope fields, the chosen body text and the article links
//! found in it.

mod normalize;
mod walker;

pub use normalize::{normalize_body, NormalizedBody};
pub use walker::{walk, FolderWalk};

use crate::extract::{ExtractedLink, LinkExtractor};
use crate::mailbox::RawMessage;
use chrono::{DateTime, Utc};

/// A fetched message reduced to what the scan needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    /// Sender as `"Name <addr>"` or `"addr"`
    pub sender: String,
    pub subject: String,
    pub date: Option<DateTime<Utc>>,

    /// Folder the message was fetched from
    pub folder: String,

    /// Chosen body text (HTML preferred)
    pub body: String,

    pub links: Vec<ExtractedLink>,
}

impl NormalizedMessage {
    /// Normalizes a raw message, or returns `None` when it has no envelope
    pub fn from_raw(raw: &RawMessage, folder: &str, extractor: &LinkExtractor) -> Option<Self> {
        let envelope = raw.envelope.as_ref()?;
        let body = normalize_body(&raw.body, extractor);

        Some(Self {
            sender: envelope.sender.clone(),
            subject: envelope.subject.clone(),
            date: envelope.date,
            folder: folder.to_string(),
            body: body.text,
            links: body.links,
        })
    }
}
