//! Mailbox access
//!
//! A scan talks to a mail store through two traits: a [`MailboxConnector`]
//! opens a [`MailboxSession`], and the session lists, selects and fetches
//! folders. All calls are blocking; the scan runs them on a blocking task.
//!
//! Two backends ship with the crate:
//! - [`DirectoryMailbox`]: folders are subdirectories, messages are files
//! - [`MemoryMailbox`]: folders held in memory, used by tests and demos

mod directory;
mod memory;

pub use directory::DirectoryMailbox;
pub use memory::MemoryMailbox;

use chrono::{DateTime, TimeZone, Utc};
use mailparse::{MailAddr, MailHeader, MailHeaderMap};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Errors raised by mailbox backends
#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Failed to fetch from {folder}: {message}")]
    Fetch { folder: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session is closed")]
    Closed,
}

/// Result type for mailbox operations
pub type MailboxResult<T> = Result<T, MailboxError>;

/// Header summary of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub message_id: String,

    /// `"Name <addr>"` when a display name is present, otherwise `"addr"`
    pub sender: String,

    pub subject: String,

    pub date: Option<DateTime<Utc>>,
}

impl Envelope {
    /// Builds an envelope from the header block of a raw message
    ///
    /// Returns `None` when the headers cannot be parsed or carry no sender.
    pub fn from_headers(raw: &[u8]) -> Option<Self> {
        let (headers, _) = mailparse::parse_headers(raw).ok()?;

        let from = headers.get_first_header("From")?;
        let sender = format_sender(from);
        if sender.is_empty() {
            return None;
        }

        let date = headers
            .get_first_value("Date")
            .and_then(|value| mailparse::dateparse(&value).ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        Some(Self {
            message_id: headers.get_first_value("Message-ID").unwrap_or_default(),
            sender,
            subject: headers.get_first_value("Subject").unwrap_or_default(),
            date,
        })
    }
}

fn format_sender(header: &MailHeader<'_>) -> String {
    let first = mailparse::addrparse_header(header)
        .ok()
        .and_then(|list| list.first().cloned());

    match first {
        Some(MailAddr::Single(info)) => match info.display_name {
            Some(name) if !name.trim().is_empty() => format!("{} <{}>", name.trim(), info.addr),
            _ => info.addr,
        },
        Some(MailAddr::Group(group)) => group.group_name,
        None => header.get_value().trim().to_string(),
    }
}

/// A message as fetched from a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Absent when the backend could not produce header data
    pub envelope: Option<Envelope>,

    /// Full RFC 5322 message bytes
    pub body: Vec<u8>,
}

impl RawMessage {
    /// Wraps raw message bytes, deriving the envelope from their headers
    pub fn parse(body: Vec<u8>) -> Self {
        Self {
            envelope: Envelope::from_headers(&body),
            body,
        }
    }
}

/// Opens sessions against a mail store
pub trait MailboxConnector: Send + Sync {
    fn connect(&self) -> MailboxResult<Box<dyn MailboxSession>>;
}

/// An open, authenticated session with a mail store
pub trait MailboxSession: Send {
    /// Lists the names of all folders
    fn list_folders(&mut self) -> MailboxResult<Vec<String>>;

    /// Selects a folder and returns its message count
    fn select_folder(&mut self, folder: &str) -> MailboxResult<u32>;

    /// Fetches messages of the selected folder by 1-based sequence number
    fn fetch_range(&mut self, range: RangeInclusive<u32>) -> MailboxResult<Vec<RawMessage>>;

    /// Ends the session; further calls fail with [`MailboxError::Closed`]
    fn close(&mut self) -> MailboxResult<()>;

    /// Selects `folder` and fetches its most recent `limit` messages
    ///
    /// A limit of 0 fetches every message. An empty folder yields an empty
    /// list without a fetch.
    fn fetch_all(&mut self, folder: &str, limit: u32) -> MailboxResult<Vec<RawMessage>> {
        let total = self.select_folder(folder)?;
        match fetch_range(total, limit) {
            Some(range) => self.fetch_range(range),
            None => Ok(Vec::new()),
        }
    }
}

/// Computes the sequence range holding the most recent `limit` messages
///
/// # Examples
///
/// ```
/// use mailsift::mailbox::fetch_range;
///
/// assert_eq!(fetch_range(50, 0), Some(1..=50));
/// assert_eq!(fetch_range(50, 10), Some(41..=50));
/// assert_eq!(fetch_range(5, 10), Some(1..=5));
/// assert_eq!(fetch_range(0, 10), None);
/// ```
pub fn fetch_range(total: u32, limit: u32) -> Option<RangeInclusive<u32>> {
    if total == 0 {
        return None;
    }

    if limit > 0 && limit < total {
        Some(total - limit + 1..=total)
    } else {
        Some(1..=total)
    }
}
