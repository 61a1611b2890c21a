//! Lazy iteration over the messages of one folder

use super::NormalizedMessage;
use crate::extract::LinkExtractor;
use crate::mailbox::{MailboxError, MailboxSession, RawMessage};

/// Normalized messages of one folder, produced on demand
///
/// The raw messages are fetched up front; normalization and link extraction
/// happen as the iterator advances, so a consumer that stops early does not
/// pay for the rest. Messages without an envelope are skipped.
pub struct FolderWalk<'a> {
    folder: &'a str,
    extractor: &'a LinkExtractor,
    messages: std::vec::IntoIter<RawMessage>,
    fetched: usize,
}

impl FolderWalk<'_> {
    /// Number of raw messages fetched from the folder
    pub fn fetched(&self) -> usize {
        self.fetched
    }
}

impl Iterator for FolderWalk<'_> {
    type Item = NormalizedMessage;

    fn next(&mut self) -> Option<Self::Item> {
        for raw in self.messages.by_ref() {
            match NormalizedMessage::from_raw(&raw, self.folder, self.extractor) {
                Some(message) => return Some(message),
                None => tracing::debug!("Skipping message without envelope in {}", self.folder),
            }
        }
        None
    }
}

/// Selects `folder` and fetches its most recent `limit` messages (0 = all)
///
/// # Errors
///
/// Returns the mailbox error when the folder cannot be selected or fetched.
pub fn walk<'a>(
    session: &mut dyn MailboxSession,
    folder: &'a str,
    limit: u32,
    extractor: &'a LinkExtractor,
) -> Result<FolderWalk<'a>, MailboxError> {
    let messages = session.fetch_all(folder, limit)?;
    tracing::debug!("Fetched {} messages from {}", messages.len(), folder);

    Ok(FolderWalk {
        folder,
        extractor,
        fetched: messages.len(),
        messages: messages.into_iter(),
    })
}
