//! Storage module for the article index
//!
//! This module handles all database operations for a scan:
//! - SQLite database initialization and schema management
//! - Idempotent article insertion keyed on the canonical URL
//! - Scan-run history
//! - Read-only queries backing the statistics report

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteArticleStore;
pub use traits::{ArticleStore, StorageError, StorageResult};

use crate::extract::ExtractedLink;
use crate::message::NormalizedMessage;
use crate::scan::ScanStatus;
use crate::SiftError;

use std::path::Path;

/// Initializes or opens an article database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteArticleStore)` - Successfully initialized storage
/// * `Err(SiftError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteArticleStore, SiftError> {
    SqliteArticleStore::new(path)
}

/// An article about to be inserted into the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub url: String,
    pub title: String,
    pub description: String,
    pub domain: String,

    /// Sender of the newsletter the link came from
    pub newsletter: String,

    /// RFC 3339 date of the email, empty when unknown
    pub email_date: String,

    pub folder: String,
}

impl NewArticle {
    /// Builds the record for one link of a normalized message
    pub fn from_link(link: &ExtractedLink, message: &NormalizedMessage) -> Self {
        Self {
            url: link.url.clone(),
            title: link.title.clone(),
            description: link.description.clone(),
            domain: link.domain.clone(),
            newsletter: message.sender.clone(),
            email_date: message
                .date
                .map(|date| date.to_rfc3339())
                .unwrap_or_default(),
            folder: message.folder.clone(),
        }
    }
}

/// Represents an article in the database
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub domain: String,
    pub newsletter: String,
    pub email_date: String,
    pub folder: String,
    pub created_at: String,
}

/// Represents a finished scan
#[derive(Debug, Clone)]
pub struct ScanRunRecord {
    pub started_at: String,
    pub finished_at: String,
    pub status: ScanStatus,

    /// Requested folders, comma separated
    pub folders: String,

    pub emails_scanned: u64,
    pub articles_found: u64,
    pub error: Option<String>,
    pub config_hash: Option<String>,
}
