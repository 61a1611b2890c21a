//! Storage traits and error types
//!
//! This module defines the trait interface for article stores and
//! associated error types.

use crate::storage::{NewArticle, ScanRunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for article index implementations
///
/// The scan only ever adds articles. Insertion is idempotent: the canonical
/// URL is the identity of an article and a second insert of the same URL is
/// silently ignored.
pub trait ArticleStore: Send {
    /// Inserts an article unless one with the same URL exists
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The article was new and has been stored
    /// * `Ok(false)` - An article with this URL already existed
    fn insert_if_absent(&mut self, article: &NewArticle) -> StorageResult<bool>;

    /// Counts the stored articles
    fn count(&self) -> StorageResult<u64>;

    /// Appends a finished scan to the run history
    ///
    /// Stores without a history ignore the record.
    fn record_scan_run(&mut self, _run: &ScanRunRecord) -> StorageResult<()> {
        Ok(())
    }
}
